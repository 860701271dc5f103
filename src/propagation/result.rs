use crate::error::GraphIssue;
use crate::registry::NodeState;
use crate::types::TypeShape;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// The shapes flowing into and out of one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypes {
    pub input: TypeShape,
    pub output: TypeShape,
    /// Problems met while computing this node, kept so that a reused node
    /// still reports them.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<GraphIssue>,
}

/// The outcome of one propagation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagationResult {
    pub nodes: BTreeMap<String, NodeTypes>,
    /// The changed nodes and everything downstream of them.
    pub dirty: BTreeSet<String>,
    /// The nodes whose transform actually ran in this pass.
    pub recomputed: BTreeSet<String>,
    pub issues: Vec<GraphIssue>,
    /// What each node was computed from, for the next incremental pass.
    #[serde(skip)]
    pub(crate) states: BTreeMap<String, NodeState>,
}

impl PropagationResult {
    pub fn node(&self, id: &str) -> Option<&NodeTypes> {
        self.nodes.get(id)
    }

    pub fn input(&self, id: &str) -> Option<&TypeShape> {
        self.nodes.get(id).map(|types| &types.input)
    }

    pub fn output(&self, id: &str) -> Option<&TypeShape> {
        self.nodes.get(id).map(|types| &types.output)
    }

    pub fn has_cycle(&self) -> bool {
        self.issues.iter().any(GraphIssue::is_cycle)
    }

    /// The ids of every node that lies on a cycle.
    pub fn cyclic_nodes(&self) -> BTreeSet<&str> {
        self.issues
            .iter()
            .filter(|issue| issue.is_cycle())
            .flat_map(GraphIssue::node_ids)
            .collect()
    }
}
