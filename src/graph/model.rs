use crate::error::GraphError;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A decision graph snapshot: the canonical input of both engines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// A typed unit of the decision graph.
///
/// `kind` selects the schema of `content`. The content itself is kept as raw
/// JSON so that unknown kinds survive a load/save cycle untouched; the known
/// kinds parse it into a typed view on demand (see [`crate::graph::content`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub position: Position,
}

/// Canvas coordinates of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn distance(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A directed data-flow connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    #[serde(alias = "sourceNodeId")]
    pub source_id: String,
    #[serde(alias = "targetNodeId")]
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Node {
    pub fn new(id: &str, kind: &str, name: &str, content: Value) -> Self {
        Self {
            id: id.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            content,
            position: Position::default(),
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y };
        self
    }
}

impl Edge {
    pub fn new(id: &str, source_id: &str, target_id: &str) -> Self {
        Self {
            id: id.to_string(),
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            source_handle: None,
            target_handle: None,
        }
    }
}

impl Graph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Parses a graph from its JDM JSON representation.
    ///
    /// Only the shape of the document is checked here; call [`Graph::validate`]
    /// to enforce the identity and endpoint invariants.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        serde_json::from_str(json).map_err(|e| GraphError::JsonParseError(e.to_string()))
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Checks that node ids are unique and that every edge endpoint exists.
    ///
    /// Both engines tolerate invalid graphs, so this is purely advisory for
    /// callers that want to reject bad input early.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut seen = AHashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNodeId(node.id.clone()));
            }
        }

        for edge in &self.edges {
            for endpoint in [&edge.source_id, &edge.target_id] {
                if !seen.contains(endpoint.as_str()) {
                    return Err(GraphError::DanglingEdge {
                        edge_id: edge.id.clone(),
                        missing_node_id: endpoint.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
