use crate::diff::ContentDiff;
use crate::error::{ContentError, GraphIssue};
use crate::graph::Node;
use crate::types::TypeShape;
use serde_json::Value;

/// What a node kind contributes to the two engines: how its content is
/// compared, how it transforms an input shape, and when a cached result for
/// it must be recomputed.
pub trait NodeSpecification: Send + Sync {
    /// The tag this specification is registered under.
    fn kind(&self) -> &str;

    /// Compares the content of two nodes of this kind.
    fn compare(&self, previous: &Node, current: &Node) -> Result<ContentDiff, ContentError>;

    /// Computes the output shape of `node` given its merged input shape.
    fn infer_output(
        &self,
        node: &Node,
        input: &TypeShape,
        context: &InferenceContext<'_>,
    ) -> Result<Inference, ContentError>;

    /// Decides whether a node must be recomputed given its previous state.
    fn needs_update(&self, previous: &NodeState, current: &NodeState) -> bool {
        previous != current
    }

    /// Whether the output depends on [`InferenceContext::external_input`].
    /// The external shape then becomes part of the node's [`NodeState`].
    fn reads_external_input(&self) -> bool {
        false
    }

    /// Content of a freshly created node of this kind.
    fn default_content(&self) -> Value;
}

/// Ambient information available while inferring a node's output.
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceContext<'a> {
    /// Shape of the live sample data, for input nodes.
    pub external_input: Option<&'a TypeShape>,
}

/// The output shape of a node plus the recoverable problems met on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub output: TypeShape,
    pub issues: Vec<GraphIssue>,
}

impl Inference {
    pub fn new(output: TypeShape) -> Self {
        Self {
            output,
            issues: Vec::new(),
        }
    }
}

/// The inputs of a node's transform, compared between two propagation runs.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeState {
    pub kind: String,
    pub input: TypeShape,
    pub content: Value,
    /// The external shape, for kinds that read it.
    pub external: Option<TypeShape>,
}

/// Types the expressions of one node, collecting an issue for every
/// expression that cannot be typed.
pub(crate) struct ExpressionTyper<'a> {
    node_id: &'a str,
    issues: Vec<GraphIssue>,
}

impl<'a> ExpressionTyper<'a> {
    pub(crate) fn new(node_id: &'a str) -> Self {
        Self {
            node_id,
            issues: Vec::new(),
        }
    }

    pub(crate) fn calculate(&mut self, input: &TypeShape, expression: &str) -> TypeShape {
        match input.try_calculate_type(expression) {
            Ok(shape) => shape,
            Err(err) => {
                tracing::debug!(node_id = self.node_id, expression, %err, "expression typed as Any");
                self.issues.push(GraphIssue::InvalidExpression {
                    node_id: self.node_id.to_string(),
                    expression: expression.to_string(),
                    message: err.to_string(),
                });
                TypeShape::Any
            }
        }
    }

    pub(crate) fn finish(self, output: TypeShape) -> Inference {
        Inference {
            output,
            issues: self.issues,
        }
    }
}
