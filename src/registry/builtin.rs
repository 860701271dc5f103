use super::mapping::compare_mapping;
use super::specification::{Inference, InferenceContext, NodeSpecification};
use crate::diff::ContentDiff;
use crate::diff::comparison::ContentChanges;
use crate::diff::matcher::Identified;
use crate::error::ContentError;
use crate::graph::{
    CustomContent, DecisionContent, FunctionContent, HitPolicy, Node, NodeKind, SchemaContent,
    SwitchContent, SwitchStatement, parse_content,
};
use crate::types::TypeShape;
use ahash::AHashMap;
use serde_json::{Value, json};
use std::sync::Arc;

use super::expression::ExpressionSpecification;
use super::table::DecisionTableSpecification;

/// Defines how every built-in specification is registered (under its tag and
/// all of its aliases) and how one is created from a kind name.
macro_rules! define_node_specifications {
    ( $( ($struct_name:ident, $kind:path) ),* $(,)? ) => {
        pub(super) fn register_default_specifications(
            registry: &mut AHashMap<String, Arc<dyn NodeSpecification>>,
        ) {
            $(
                let specification: Arc<dyn NodeSpecification> = Arc::new($struct_name);
                for tag in std::iter::once($kind.tag()).chain($kind.aliases().iter().copied()) {
                    registry.insert(tag.to_string(), Arc::clone(&specification));
                }
            )*
        }

        pub(super) fn create_specification_by_name(name: &str) -> Option<Arc<dyn NodeSpecification>> {
            match NodeKind::from_tag(name)? {
                $( $kind => Some(Arc::new($struct_name)), )*
            }
        }
    };
}

define_node_specifications! {
    (InputSpecification, NodeKind::Input),
    (OutputSpecification, NodeKind::Output),
    (ExpressionSpecification, NodeKind::Expression),
    (DecisionTableSpecification, NodeKind::DecisionTable),
    (SwitchSpecification, NodeKind::Switch),
    (FunctionSpecification, NodeKind::Function),
    (DecisionSpecification, NodeKind::Decision),
    (CustomSpecification, NodeKind::Custom),
}

pub(crate) fn hit_policy_tag(policy: Option<HitPolicy>) -> &'static str {
    match policy.unwrap_or_default() {
        HitPolicy::First => "first",
        HitPolicy::Collect => "collect",
    }
}

fn compare_schema(kind: &str, previous: &Node, current: &Node) -> Result<ContentDiff, ContentError> {
    let before: SchemaContent = parse_content(kind, &previous.content)?;
    let after: SchemaContent = parse_content(kind, &current.content)?;
    let mut changes = ContentChanges::new();
    changes.string("schema", before.schema.as_deref(), after.schema.as_deref());
    Ok(changes.into_content_diff())
}

/// The request node. Its output is the live sample shape when one is
/// supplied, else the shape described by its JSON Schema.
pub(crate) struct InputSpecification;

impl NodeSpecification for InputSpecification {
    fn kind(&self) -> &str {
        NodeKind::Input.tag()
    }

    fn compare(&self, previous: &Node, current: &Node) -> Result<ContentDiff, ContentError> {
        compare_schema(self.kind(), previous, current)
    }

    fn infer_output(
        &self,
        node: &Node,
        input: &TypeShape,
        context: &InferenceContext<'_>,
    ) -> Result<Inference, ContentError> {
        if let Some(external) = context.external_input {
            return Ok(Inference::new(external.clone()));
        }
        let content: SchemaContent = parse_content(self.kind(), &node.content)?;
        let output = match content.schema_document() {
            Some(schema) => TypeShape::from_json_schema(&schema),
            None => input.clone(),
        };
        Ok(Inference::new(output))
    }

    fn reads_external_input(&self) -> bool {
        true
    }

    fn default_content(&self) -> Value {
        json!({})
    }
}

pub(crate) struct OutputSpecification;

impl NodeSpecification for OutputSpecification {
    fn kind(&self) -> &str {
        NodeKind::Output.tag()
    }

    fn compare(&self, previous: &Node, current: &Node) -> Result<ContentDiff, ContentError> {
        compare_schema(self.kind(), previous, current)
    }

    fn infer_output(
        &self,
        _node: &Node,
        input: &TypeShape,
        _context: &InferenceContext<'_>,
    ) -> Result<Inference, ContentError> {
        Ok(Inference::new(input.clone()))
    }

    fn default_content(&self) -> Value {
        json!({})
    }
}

impl Identified for SwitchStatement {
    fn identity(&self) -> Option<&str> {
        Some(self.id.as_str()).filter(|id| !id.is_empty())
    }

    fn fingerprint(&self) -> Option<String> {
        self.condition.as_deref().map(|c| c.trim().to_string())
    }
}

/// Routes its input unchanged to whichever branch matches.
pub(crate) struct SwitchSpecification;

impl NodeSpecification for SwitchSpecification {
    fn kind(&self) -> &str {
        NodeKind::Switch.tag()
    }

    fn compare(&self, previous: &Node, current: &Node) -> Result<ContentDiff, ContentError> {
        let before: SwitchContent = parse_content(self.kind(), &previous.content)?;
        let after: SwitchContent = parse_content(self.kind(), &current.content)?;

        let mut changes = ContentChanges::new();
        changes
            .string(
                "hitPolicy",
                Some(hit_policy_tag(before.hit_policy)),
                Some(hit_policy_tag(after.hit_policy)),
            )
            .list("statements", &before.statements, &after.statements, |p, c| {
                let mut row = ContentChanges::new();
                row.string("condition", p.condition.as_deref(), c.condition.as_deref());
                row.into_fields()
            });
        Ok(changes.into_content_diff())
    }

    fn infer_output(
        &self,
        _node: &Node,
        input: &TypeShape,
        _context: &InferenceContext<'_>,
    ) -> Result<Inference, ContentError> {
        Ok(Inference::new(input.clone()))
    }

    fn default_content(&self) -> Value {
        json!({ "hitPolicy": "first", "statements": [] })
    }
}

/// Arbitrary user code. Its output cannot be known statically.
pub(crate) struct FunctionSpecification;

impl NodeSpecification for FunctionSpecification {
    fn kind(&self) -> &str {
        NodeKind::Function.tag()
    }

    fn compare(&self, previous: &Node, current: &Node) -> Result<ContentDiff, ContentError> {
        let before: FunctionContent = parse_content(self.kind(), &previous.content)?;
        let after: FunctionContent = parse_content(self.kind(), &current.content)?;
        let mut changes = ContentChanges::new();
        changes.string("source", Some(before.source()), Some(after.source()));
        Ok(changes.into_content_diff())
    }

    fn infer_output(
        &self,
        node: &Node,
        _input: &TypeShape,
        _context: &InferenceContext<'_>,
    ) -> Result<Inference, ContentError> {
        parse_content::<FunctionContent>(self.kind(), &node.content)?;
        Ok(Inference::new(TypeShape::Any))
    }

    fn default_content(&self) -> Value {
        json!({ "source": "" })
    }
}

/// A call into another decision. The callee's output is unknown, so only a
/// pass-through input survives.
pub(crate) struct DecisionSpecification;

impl NodeSpecification for DecisionSpecification {
    fn kind(&self) -> &str {
        NodeKind::Decision.tag()
    }

    fn compare(&self, previous: &Node, current: &Node) -> Result<ContentDiff, ContentError> {
        let before: DecisionContent = parse_content(self.kind(), &previous.content)?;
        let after: DecisionContent = parse_content(self.kind(), &current.content)?;
        let mut changes = ContentChanges::new();
        changes.string("key", before.key.as_deref(), after.key.as_deref());
        compare_mapping(&mut changes, &before.mapping, &after.mapping);
        Ok(changes.into_content_diff())
    }

    fn infer_output(
        &self,
        node: &Node,
        input: &TypeShape,
        _context: &InferenceContext<'_>,
    ) -> Result<Inference, ContentError> {
        let content: DecisionContent = parse_content(self.kind(), &node.content)?;
        let output = if content.mapping.pass_through() {
            input.clone()
        } else {
            TypeShape::Any
        };
        Ok(Inference::new(output))
    }

    fn default_content(&self) -> Value {
        json!({ "key": "" })
    }
}

/// A user-defined component. Its configuration is opaque and its input flows
/// through unchanged.
pub(crate) struct CustomSpecification;

impl NodeSpecification for CustomSpecification {
    fn kind(&self) -> &str {
        NodeKind::Custom.tag()
    }

    fn compare(&self, previous: &Node, current: &Node) -> Result<ContentDiff, ContentError> {
        let before: CustomContent = parse_content(self.kind(), &previous.content)?;
        let after: CustomContent = parse_content(self.kind(), &current.content)?;
        let mut changes = ContentChanges::new();
        changes
            .string("kind", before.kind.as_deref(), after.kind.as_deref())
            .value("config", &before.config, &after.config);
        Ok(changes.into_content_diff())
    }

    fn infer_output(
        &self,
        _node: &Node,
        input: &TypeShape,
        _context: &InferenceContext<'_>,
    ) -> Result<Inference, ContentError> {
        Ok(Inference::new(input.clone()))
    }

    fn default_content(&self) -> Value {
        json!({ "config": {} })
    }
}

/// The fallback for kinds nobody registered: content is compared as a whole
/// by deep equality and the output type is unknown.
pub(crate) struct OpaqueSpecification;

impl NodeSpecification for OpaqueSpecification {
    fn kind(&self) -> &str {
        "opaque"
    }

    fn compare(&self, previous: &Node, current: &Node) -> Result<ContentDiff, ContentError> {
        let mut changes = ContentChanges::new();
        changes.value("content", &previous.content, &current.content);
        Ok(changes.into_content_diff())
    }

    fn infer_output(
        &self,
        _node: &Node,
        _input: &TypeShape,
        _context: &InferenceContext<'_>,
    ) -> Result<Inference, ContentError> {
        Ok(Inference::new(TypeShape::Any))
    }

    fn default_content(&self) -> Value {
        Value::Null
    }
}
