use super::builtin::hit_policy_tag;
use super::mapping::{compare_mapping, mapped_input, mapped_output};
use super::specification::{ExpressionTyper, Inference, InferenceContext, NodeSpecification};
use crate::diff::comparison::{ContentChanges, compare_string_fields, compare_values};
use crate::diff::matcher::Identified;
use crate::diff::{ContentDiff, FieldDiffs};
use crate::error::ContentError;
use crate::graph::{DecisionTableContent, HitPolicy, Node, NodeKind, TableColumn, parse_content};
use crate::types::TypeShape;
use itertools::Itertools;
use serde_json::{Map, Value, json};

const RULE_ID: &str = "_id";

impl Identified for TableColumn {
    fn identity(&self) -> Option<&str> {
        Some(self.id.as_str()).filter(|id| !id.is_empty())
    }

    fn fingerprint(&self) -> Option<String> {
        self.field.as_deref().map(|field| field.trim().to_string())
    }
}

/// Rules are keyed by `_id`; rules without one are paired by their cells.
impl Identified for Map<String, Value> {
    fn identity(&self) -> Option<&str> {
        self.get(RULE_ID)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    fn fingerprint(&self) -> Option<String> {
        let cells: Map<String, Value> = self
            .iter()
            .filter(|(key, _)| key.as_str() != RULE_ID)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        serde_json::to_string(&cells).ok()
    }
}

/// A decision table: every output column contributes the union of its cell
/// types at the column's `field`.
pub(crate) struct DecisionTableSpecification;

impl NodeSpecification for DecisionTableSpecification {
    fn kind(&self) -> &str {
        NodeKind::DecisionTable.tag()
    }

    fn compare(&self, previous: &Node, current: &Node) -> Result<ContentDiff, ContentError> {
        let before: DecisionTableContent = parse_content(self.kind(), &previous.content)?;
        let after: DecisionTableContent = parse_content(self.kind(), &current.content)?;

        let mut changes = ContentChanges::new();
        changes.string(
            "hitPolicy",
            Some(hit_policy_tag(before.hit_policy)),
            Some(hit_policy_tag(after.hit_policy)),
        );
        compare_mapping(&mut changes, &before.mapping, &after.mapping);
        changes
            .list("inputs", &before.inputs, &after.inputs, compare_columns)
            .list("outputs", &before.outputs, &after.outputs, compare_columns)
            .list("rules", &before.rules, &after.rules, compare_rules);
        Ok(changes.into_content_diff())
    }

    fn infer_output(
        &self,
        node: &Node,
        input: &TypeShape,
        _context: &InferenceContext<'_>,
    ) -> Result<Inference, ContentError> {
        let content: DecisionTableContent = parse_content(self.kind(), &node.content)?;
        let mut typer = ExpressionTyper::new(&node.id);

        let node_input = mapped_input(&content.mapping, input, &mut typer);
        let mut determined = TypeShape::empty_object();
        for column in &content.outputs {
            let Some(field) = column.field.as_deref().map(str::trim).filter(|f| !f.is_empty())
            else {
                continue;
            };
            let cells: Vec<TypeShape> = content
                .rules
                .iter()
                .filter_map(|rule| DecisionTableContent::cell(rule, &column.id))
                .map(|cell| typer.calculate(&node_input, cell))
                .collect();
            determined.set(field, TypeShape::union(cells));
        }

        if content.hit_policy == Some(HitPolicy::Collect) {
            determined = determined.into_array();
        }
        let output = mapped_output(&content.mapping, input, determined);
        Ok(typer.finish(output))
    }

    fn default_content(&self) -> Value {
        json!({ "hitPolicy": "first", "inputs": [], "outputs": [], "rules": [] })
    }
}

fn compare_columns(previous: &TableColumn, current: &TableColumn) -> FieldDiffs {
    let mut row = ContentChanges::new();
    row.string("name", previous.name.as_deref(), current.name.as_deref())
        .string("field", previous.field.as_deref(), current.field.as_deref());
    row.into_fields()
}

/// Compares a rule cell by cell. Text cells are trimmed, anything else is
/// compared structurally.
fn compare_rules(previous: &Map<String, Value>, current: &Map<String, Value>) -> FieldDiffs {
    let mut row = ContentChanges::new();
    let columns = previous
        .keys()
        .chain(current.keys())
        .filter(|key| key.as_str() != RULE_ID)
        .sorted()
        .dedup();

    for column in columns {
        let before = previous.get(column);
        let after = current.get(column);
        let diff = match (before, after) {
            (None | Some(Value::String(_)), None | Some(Value::String(_))) => {
                compare_string_fields(
                    before.and_then(Value::as_str),
                    after.and_then(Value::as_str),
                )
            }
            _ => compare_values(
                before.unwrap_or(&Value::Null),
                after.unwrap_or(&Value::Null),
            ),
        };
        row.record(column, diff);
    }
    row.into_fields()
}
