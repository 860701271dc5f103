use crate::error::GraphIssue;
use crate::graph::{Edge, Graph, Node};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Change classification of an entity or field between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DiffStatus {
    Added,
    Removed,
    Modified,
    Moved,
}

/// The change of a single field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDiff {
    pub status: DiffStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_value: Option<Value>,
}

impl FieldDiff {
    pub fn modified(previous_value: Option<Value>) -> Self {
        Self {
            status: DiffStatus::Modified,
            previous_value,
        }
    }
}

/// Field-level changes keyed by field path.
pub type FieldDiffs = BTreeMap<String, FieldDiff>;

/// The annotation attached to a changed entity.
///
/// `moved` is the position axis and is independent of content: an entity that
/// changed and moved has `status: modified, moved: true`, one that only moved
/// has `status: moved, moved: true`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffMetadata {
    pub status: DiffStatus,
    pub moved: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: FieldDiffs,
}

impl DiffMetadata {
    pub fn added() -> Self {
        Self {
            status: DiffStatus::Added,
            moved: false,
            fields: FieldDiffs::new(),
        }
    }

    pub fn removed() -> Self {
        Self {
            status: DiffStatus::Removed,
            moved: false,
            fields: FieldDiffs::new(),
        }
    }

    /// Classifies a paired entity. Returns `None` when it is unchanged.
    pub fn paired(fields: FieldDiffs, moved: bool) -> Option<Self> {
        let status = match (fields.is_empty(), moved) {
            (true, false) => return None,
            (true, true) => DiffStatus::Moved,
            (false, _) => DiffStatus::Modified,
        };
        Some(Self {
            status,
            moved,
            fields,
        })
    }
}

/// A row of a structural list field (an expression, a table rule, a column,
/// a switch statement). Removed rows carry their previous value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedRow {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffMetadata>,
}

/// The outcome of comparing the content of two nodes of the same kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDiff {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: FieldDiffs,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub lists: BTreeMap<String, Vec<AnnotatedRow>>,
}

impl ContentDiff {
    pub fn has_changes(&self) -> bool {
        !self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedNode {
    #[serde(flatten)]
    pub node: Node,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffMetadata>,
    /// Per-row annotations of the node's list fields.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub lists: BTreeMap<String, Vec<AnnotatedRow>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedEdge {
    #[serde(flatten)]
    pub edge: Edge,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffMetadata>,
}

/// The current graph with diff metadata layered on top, plus the removed
/// entries of the previous graph placed where they used to be.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedGraph {
    pub nodes: Vec<AnnotatedNode>,
    pub edges: Vec<AnnotatedEdge>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<GraphIssue>,
}

/// Status counts over the nodes and edges of an [`AnnotatedGraph`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub moved: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    pub fn has_changes(&self) -> bool {
        self.added + self.removed + self.modified + self.moved > 0
    }

    fn count(&mut self, diff: Option<&DiffMetadata>) {
        match diff.map(|d| d.status) {
            None => self.unchanged += 1,
            Some(DiffStatus::Added) => self.added += 1,
            Some(DiffStatus::Removed) => self.removed += 1,
            Some(DiffStatus::Modified) => self.modified += 1,
            Some(DiffStatus::Moved) => self.moved += 1,
        }
    }
}

impl AnnotatedGraph {
    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for node in &self.nodes {
            summary.count(node.diff.as_ref());
        }
        for edge in &self.edges {
            summary.count(edge.diff.as_ref());
        }
        summary
    }

    /// Strips the annotations and removed entries, which yields the current
    /// graph the diff was computed against.
    pub fn current_graph(&self) -> Graph {
        Graph {
            nodes: self
                .nodes
                .iter()
                .filter(|n| !is_removed(n.diff.as_ref()))
                .map(|n| n.node.clone())
                .collect(),
            edges: self
                .edges
                .iter()
                .filter(|e| !is_removed(e.diff.as_ref()))
                .map(|e| e.edge.clone())
                .collect(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&AnnotatedNode> {
        self.nodes.iter().find(|n| n.node.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&AnnotatedEdge> {
        self.edges.iter().find(|e| e.edge.id == id)
    }
}

fn is_removed(diff: Option<&DiffMetadata>) -> bool {
    matches!(diff, Some(d) if d.status == DiffStatus::Removed)
}
