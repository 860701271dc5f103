//! The structural diff engine: aligns two graph snapshots and annotates the
//! current one with field-level change metadata.

pub mod comparison;
pub mod matcher;
pub mod model;

pub use matcher::{AlignedPair, Alignment, Identified, align};
pub use model::*;

use crate::error::GraphIssue;
use crate::graph::{Edge, Graph, Node};
use crate::registry::NodeRegistry;
use comparison::ContentChanges;
use std::collections::BTreeSet;

impl Identified for Node {
    fn identity(&self) -> Option<&str> {
        Some(&self.id)
    }
}

impl Identified for Edge {
    fn identity(&self) -> Option<&str> {
        Some(&self.id)
    }
}

/// Compares two graph snapshots.
///
/// A differ is immutable once built and holds no per-call state, so one
/// instance can serve any number of (possibly concurrent) calls.
#[derive(Debug, Clone, Default)]
pub struct Differ {
    registry: NodeRegistry,
    position_threshold: Option<f64>,
}

#[derive(Debug, Default)]
pub struct DifferBuilder {
    registry: Option<NodeRegistry>,
    position_threshold: Option<f64>,
}

impl DifferBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags a node as moved when its canvas position changed by more than
    /// `threshold` pixels. Disabled by default.
    pub fn with_position_threshold(mut self, threshold: f64) -> Self {
        self.position_threshold = Some(threshold);
        self
    }

    pub fn with_registry(mut self, registry: NodeRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Differ {
        Differ {
            registry: self.registry.unwrap_or_default(),
            position_threshold: self.position_threshold,
        }
    }
}

impl Differ {
    pub fn builder() -> DifferBuilder {
        DifferBuilder::new()
    }

    /// Diffs `previous` against `current`. Neither input is modified.
    pub fn diff(&self, previous: &Graph, current: &Graph) -> AnnotatedGraph {
        let mut issues = BTreeSet::new();

        let node_alignment = align(&previous.nodes, &current.nodes);
        let nodes: Vec<AnnotatedNode> = node_alignment
            .pairs
            .iter()
            .filter_map(|pair| match (pair.previous, pair.current) {
                (Some(i), Some(j)) => Some(self.diff_node(
                    &previous.nodes[i],
                    &current.nodes[j],
                    pair.moved,
                    &mut issues,
                )),
                (None, Some(j)) => Some(annotate(&current.nodes[j], DiffMetadata::added())),
                (Some(i), None) => Some(annotate(&previous.nodes[i], DiffMetadata::removed())),
                (None, None) => None,
            })
            .collect();

        let edge_alignment = align(&previous.edges, &current.edges);
        let edges: Vec<AnnotatedEdge> = edge_alignment
            .pairs
            .iter()
            .filter_map(|pair| match (pair.previous, pair.current) {
                (Some(i), Some(j)) => Some(diff_edge(&previous.edges[i], &current.edges[j], pair.moved)),
                (None, Some(j)) => Some(AnnotatedEdge {
                    edge: current.edges[j].clone(),
                    diff: Some(DiffMetadata::added()),
                }),
                (Some(i), None) => Some(AnnotatedEdge {
                    edge: previous.edges[i].clone(),
                    diff: Some(DiffMetadata::removed()),
                }),
                (None, None) => None,
            })
            .collect();

        let annotated = AnnotatedGraph {
            nodes,
            edges,
            issues: issues.into_iter().collect(),
        };
        tracing::debug!(summary = ?annotated.summary(), issues = annotated.issues.len(), "graph diff complete");
        annotated
    }

    fn diff_node(
        &self,
        previous: &Node,
        current: &Node,
        reordered: bool,
        issues: &mut BTreeSet<GraphIssue>,
    ) -> AnnotatedNode {
        let mut changes = ContentChanges::new();
        changes.string("name", Some(previous.name.as_str()), Some(current.name.as_str()));

        let content = if self.same_kind(&previous.kind, &current.kind) {
            self.compare_content(previous, current, issues)
        } else {
            changes.string("type", Some(previous.kind.as_str()), Some(current.kind.as_str()));
            self.registry.opaque().compare(previous, current).unwrap_or_default()
        };

        let mut fields = changes.into_fields();
        fields.extend(content.fields);

        let repositioned = self
            .position_threshold
            .is_some_and(|threshold| previous.position.distance(&current.position) > threshold);

        AnnotatedNode {
            node: current.clone(),
            diff: DiffMetadata::paired(fields, reordered || repositioned),
            lists: content.lists,
        }
    }

    /// Compares the content of two nodes of the same kind, falling back to
    /// an opaque comparison when the kind is unknown or the content does not
    /// fit its schema.
    fn compare_content(
        &self,
        previous: &Node,
        current: &Node,
        issues: &mut BTreeSet<GraphIssue>,
    ) -> ContentDiff {
        let Some(specification) = self.registry.get(&current.kind) else {
            tracing::debug!(node_id = %current.id, kind = %current.kind, "comparing unknown kind opaquely");
            issues.insert(GraphIssue::UnknownKind {
                node_id: current.id.clone(),
                kind: current.kind.clone(),
            });
            return self.registry.opaque().compare(previous, current).unwrap_or_default();
        };

        match specification.compare(previous, current) {
            Ok(diff) => diff,
            Err(err) => {
                tracing::warn!(node_id = %current.id, %err, "malformed content, comparing opaquely");
                issues.insert(GraphIssue::MalformedContent {
                    node_id: current.id.clone(),
                    kind: current.kind.clone(),
                    message: err.to_string(),
                });
                self.registry.opaque().compare(previous, current).unwrap_or_default()
            }
        }
    }

    /// Two tags denote the same kind when they resolve to the same
    /// registered specification (e.g. `expr` and `expressionNode`).
    fn same_kind(&self, previous: &str, current: &str) -> bool {
        if previous == current {
            return true;
        }
        match (self.registry.get(previous), self.registry.get(current)) {
            (Some(a), Some(b)) => a.kind() == b.kind(),
            _ => false,
        }
    }
}

fn annotate(node: &Node, diff: DiffMetadata) -> AnnotatedNode {
    AnnotatedNode {
        node: node.clone(),
        diff: Some(diff),
        lists: Default::default(),
    }
}

fn diff_edge(previous: &Edge, current: &Edge, moved: bool) -> AnnotatedEdge {
    let mut changes = ContentChanges::new();
    changes
        .string("sourceId", Some(previous.source_id.as_str()), Some(current.source_id.as_str()))
        .string("targetId", Some(previous.target_id.as_str()), Some(current.target_id.as_str()))
        .string(
            "sourceHandle",
            previous.source_handle.as_deref(),
            current.source_handle.as_deref(),
        )
        .string(
            "targetHandle",
            previous.target_handle.as_deref(),
            current.target_handle.as_deref(),
        );

    AnnotatedEdge {
        edge: current.clone(),
        diff: DiffMetadata::paired(changes.into_fields(), moved),
    }
}

/// Diffs two graphs with the built-in registry and default options.
pub fn diff(previous: &Graph, current: &Graph) -> AnnotatedGraph {
    Differ::default().diff(previous, current)
}
