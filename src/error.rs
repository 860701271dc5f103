use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while loading or validating a decision graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Failed to parse graph JSON: {0}")]
    JsonParseError(String),

    #[error("Node id '{0}' is used by more than one node")]
    DuplicateNodeId(String),

    #[error("Edge '{edge_id}' references node '{missing_node_id}', which is not part of the graph")]
    DanglingEdge {
        edge_id: String,
        missing_node_id: String,
    },
}

/// Errors raised when a node's content does not fit the schema of its kind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContentError {
    #[error("Content does not match the '{kind}' schema: {message}")]
    Malformed { kind: String, message: String },
}

impl ContentError {
    pub(crate) fn malformed(kind: &str, err: impl std::fmt::Display) -> Self {
        ContentError::Malformed {
            kind: kind.to_string(),
            message: err.to_string(),
        }
    }
}

/// Errors that can occur while parsing or symbolically typing an expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Unexpected character '{character}' at offset {offset}")]
    UnexpectedCharacter { character: char, offset: usize },

    #[error("Unexpected token '{found}' at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        offset: usize,
    },

    #[error("Unexpected end of expression, expected {0}")]
    UnexpectedEnd(String),

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Function '{name}' expects {expected} arguments, but received {found}")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Operator '{operator}' cannot be applied to a value of type {found}")]
    InvalidOperand { operator: String, found: String },

    #[error("Invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    #[error("Expression nesting exceeds the maximum depth of {0}")]
    DepthExceeded(usize),
}

/// A recoverable problem found while diffing or propagating types.
///
/// Issues never abort a pass. The affected unit (one node, one field, one
/// expression) degrades to an opaque comparison or to `Any`, and the issue is
/// reported alongside the partial result.
#[derive(Error, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "issue", rename_all = "camelCase")]
pub enum GraphIssue {
    #[error("Node '{node_id}' has content that does not match its '{kind}' kind: {message}")]
    #[serde(rename_all = "camelCase")]
    MalformedContent {
        node_id: String,
        kind: String,
        message: String,
    },

    #[error("Node '{node_id}' has an unregistered kind '{kind}'")]
    #[serde(rename_all = "camelCase")]
    UnknownKind { node_id: String, kind: String },

    #[error("Nodes [{}] form a cyclic dependency", node_ids.join(", "))]
    #[serde(rename_all = "camelCase")]
    CyclicDependency { node_ids: Vec<String> },

    #[error("Expression '{expression}' in node '{node_id}' is invalid: {message}")]
    #[serde(rename_all = "camelCase")]
    InvalidExpression {
        node_id: String,
        expression: String,
        message: String,
    },
}

impl GraphIssue {
    /// The node ids this issue is attached to.
    pub fn node_ids(&self) -> Vec<&str> {
        match self {
            GraphIssue::MalformedContent { node_id, .. }
            | GraphIssue::UnknownKind { node_id, .. }
            | GraphIssue::InvalidExpression { node_id, .. } => vec![node_id.as_str()],
            GraphIssue::CyclicDependency { node_ids } => {
                node_ids.iter().map(String::as_str).collect()
            }
        }
    }

    pub fn is_cycle(&self) -> bool {
        matches!(self, GraphIssue::CyclicDependency { .. })
    }
}
