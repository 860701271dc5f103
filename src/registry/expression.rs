use super::mapping::{compare_mapping, mapped_input, mapped_output};
use super::specification::{ExpressionTyper, Inference, InferenceContext, NodeSpecification};
use crate::diff::ContentDiff;
use crate::diff::comparison::ContentChanges;
use crate::diff::matcher::Identified;
use crate::error::ContentError;
use crate::graph::{ExpressionContent, ExpressionRow, Node, NodeKind, parse_content};
use crate::types::TypeShape;
use serde_json::{Value, json};

impl Identified for ExpressionRow {
    fn identity(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    fn fingerprint(&self) -> Option<String> {
        self.key.as_deref().map(|key| key.trim().to_string())
    }
}

/// A list of `key = expression` rows evaluated in order. Each row sees the
/// rows before it under `$`, so `$.total` refers to an earlier `total` row.
pub(crate) struct ExpressionSpecification;

impl NodeSpecification for ExpressionSpecification {
    fn kind(&self) -> &str {
        NodeKind::Expression.tag()
    }

    fn compare(&self, previous: &Node, current: &Node) -> Result<ContentDiff, ContentError> {
        let before: ExpressionContent = parse_content(self.kind(), &previous.content)?;
        let after: ExpressionContent = parse_content(self.kind(), &current.content)?;

        let mut changes = ContentChanges::new();
        compare_mapping(&mut changes, &before.mapping, &after.mapping);
        changes.list("expressions", &before.expressions, &after.expressions, |p, c| {
            let mut row = ContentChanges::new();
            row.string("key", p.key.as_deref(), c.key.as_deref())
                .string("value", p.value.as_deref(), c.value.as_deref());
            row.into_fields()
        });
        Ok(changes.into_content_diff())
    }

    fn infer_output(
        &self,
        node: &Node,
        input: &TypeShape,
        _context: &InferenceContext<'_>,
    ) -> Result<Inference, ContentError> {
        let content: ExpressionContent = parse_content(self.kind(), &node.content)?;
        let mut typer = ExpressionTyper::new(&node.id);

        let mut node_input = mapped_input(&content.mapping, input, &mut typer);
        let mut determined = TypeShape::empty_object();
        for row in &content.expressions {
            let (Some(key), Some(value)) = (non_blank(&row.key), non_blank(&row.value)) else {
                continue;
            };
            let shape = typer.calculate(&node_input, value);
            node_input.set(&format!("$.{}", key), shape.clone());
            determined.set(key, shape);
        }

        let output = mapped_output(&content.mapping, input, determined);
        Ok(typer.finish(output))
    }

    fn default_content(&self) -> Value {
        json!({ "expressions": [] })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
