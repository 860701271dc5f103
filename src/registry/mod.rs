//! The mapping from a node's kind tag to the [`NodeSpecification`] that
//! compares its content and infers its output shape.

use ahash::AHashMap;
use std::sync::Arc;

mod builtin;
mod expression;
mod mapping;
pub mod specification;
mod table;

use builtin::*;
pub use specification::{Inference, InferenceContext, NodeSpecification, NodeState};

/// An open registry of node specifications keyed by kind tag.
///
/// Every built-in kind is registered under its canonical tag and its aliases.
/// Lookups of unknown tags return `None`; callers fall back to
/// [`NodeRegistry::opaque`].
#[derive(Clone)]
pub struct NodeRegistry {
    specifications: AHashMap<String, Arc<dyn NodeSpecification>>,
    opaque: Arc<dyn NodeSpecification>,
}

pub struct NodeRegistryBuilder {
    specifications: AHashMap<String, Arc<dyn NodeSpecification>>,
}

impl NodeRegistryBuilder {
    pub fn new() -> Self {
        let mut specifications: AHashMap<String, Arc<dyn NodeSpecification>> = AHashMap::new();
        register_default_specifications(&mut specifications);
        Self { specifications }
    }

    /// Handles nodes tagged `user_kind` like the built-in kind `builtin_kind`.
    /// Unknown built-in names are ignored.
    pub fn with_kind_alias(mut self, user_kind: &str, builtin_kind: &str) -> Self {
        match create_specification_by_name(builtin_kind) {
            Some(specification) => {
                self.specifications
                    .insert(user_kind.to_string(), specification);
            }
            None => tracing::warn!(user_kind, builtin_kind, "alias targets an unknown kind"),
        }
        self
    }

    /// Registers a specification under its own kind tag, replacing any
    /// existing one.
    pub fn with_specification(mut self, specification: Box<dyn NodeSpecification>) -> Self {
        let specification: Arc<dyn NodeSpecification> = Arc::from(specification);
        self.specifications
            .insert(specification.kind().to_string(), specification);
        self
    }

    pub fn build(self) -> NodeRegistry {
        NodeRegistry {
            specifications: self.specifications,
            opaque: Arc::new(OpaqueSpecification),
        }
    }
}

impl Default for NodeRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    pub fn builder() -> NodeRegistryBuilder {
        NodeRegistryBuilder::new()
    }

    pub fn get(&self, kind: &str) -> Option<&dyn NodeSpecification> {
        self.specifications.get(kind).map(|s| s.as_ref())
    }

    /// The fallback used for kinds that are not registered.
    pub fn opaque(&self) -> &dyn NodeSpecification {
        self.opaque.as_ref()
    }

    /// The specification for `kind`, or the opaque fallback.
    pub fn resolve(&self, kind: &str) -> &dyn NodeSpecification {
        self.get(kind).unwrap_or_else(|| self.opaque())
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.specifications.contains_key(kind)
    }

    /// Default content for a new node of `kind`, `null` for unknown kinds.
    pub fn default_content(&self, kind: &str) -> serde_json::Value {
        self.resolve(kind).default_content()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        NodeRegistryBuilder::new().build()
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.specifications.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("NodeRegistry").field("kinds", &kinds).finish()
    }
}
