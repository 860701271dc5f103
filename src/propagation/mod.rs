//! The type propagation engine: computes every node's input and output shape
//! in dependency order.

mod result;
mod topology;

pub use result::{NodeTypes, PropagationResult};

use crate::error::GraphIssue;
use crate::graph::Graph;
use crate::registry::{Inference, InferenceContext, NodeRegistry, NodeState};
use crate::types::{MAX_SHAPE_DEPTH, TypeShape};
use std::collections::BTreeSet;
use topology::{KahnOrder, Topology, find_cycles};

/// Propagates shapes through a graph.
///
/// Like the differ, a propagator holds configuration only. The caller owns
/// change tracking and hands in the previous result to reuse unchanged nodes.
#[derive(Debug, Clone, Default)]
pub struct Propagator {
    registry: NodeRegistry,
    external_input: Option<TypeShape>,
}

#[derive(Debug, Default)]
pub struct PropagatorBuilder {
    registry: Option<NodeRegistry>,
    external_input: Option<TypeShape>,
}

impl PropagatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shape of the live sample data fed to input nodes.
    pub fn with_external_input(mut self, shape: TypeShape) -> Self {
        self.external_input = Some(shape);
        self
    }

    pub fn with_registry(mut self, registry: NodeRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Propagator {
        Propagator {
            registry: self.registry.unwrap_or_default(),
            external_input: self.external_input,
        }
    }
}

impl Propagator {
    pub fn builder() -> PropagatorBuilder {
        PropagatorBuilder::new()
    }

    /// Computes the shapes of every node of `graph`.
    ///
    /// Nodes are visited in topological order. With a `previous` result, a
    /// node that is not in `changed` and whose kind, content and input shape
    /// are what they were last time keeps its previous shapes. Nodes on a
    /// cycle resolve to `Any` and are reported as one `CyclicDependency`
    /// issue per cycle.
    pub fn propagate(
        &self,
        graph: &Graph,
        changed: &BTreeSet<String>,
        previous: Option<&PropagationResult>,
    ) -> PropagationResult {
        let topology = Topology::new(graph);
        let mut result = PropagationResult::default();

        let seeds = changed
            .iter()
            .filter_map(|id| topology.index.get(id.as_str()).copied());
        let dirty = topology.downstream_closure(seeds);
        result.dirty = (0..topology.len())
            .filter(|&v| dirty[v])
            .map(|v| topology.nodes[v].id.clone())
            .collect();

        let context = InferenceContext {
            external_input: self.external_input.as_ref(),
        };
        let mut order = KahnOrder::new(&topology);
        let mut cycles_resolved = false;

        loop {
            while let Some(v) = order.next() {
                self.visit(&topology, v, changed, previous, &context, &mut result);
                order.resolve(&topology, v);
            }
            if order.is_complete() || cycles_resolved {
                break;
            }

            // Kahn stalled: whatever is left lies on or below a cycle.
            for cycle in find_cycles(&topology, &order) {
                let node_ids: Vec<String> = cycle
                    .iter()
                    .map(|&v| topology.nodes[v].id.clone())
                    .collect();
                tracing::warn!(nodes = ?node_ids, "cyclic dependency, resolving to Any");
                for id in &node_ids {
                    result.nodes.insert(
                        id.clone(),
                        NodeTypes {
                            input: TypeShape::Any,
                            output: TypeShape::Any,
                            issues: Vec::new(),
                        },
                    );
                    result.recomputed.insert(id.clone());
                }
                result.issues.push(GraphIssue::CyclicDependency { node_ids });
                order.resolve_cycle(&topology, &cycle);
            }
            cycles_resolved = true;
        }

        for types in result.nodes.values() {
            result.issues.extend(types.issues.iter().cloned());
        }
        result.issues.sort();
        result.issues.dedup();

        tracing::debug!(
            nodes = result.nodes.len(),
            recomputed = result.recomputed.len(),
            reused = result.nodes.len() - result.recomputed.len(),
            issues = result.issues.len(),
            "type propagation complete"
        );
        result
    }

    /// Computes (or reuses) the shapes of one node whose upstream nodes are
    /// all resolved.
    fn visit(
        &self,
        topology: &Topology<'_>,
        v: usize,
        changed: &BTreeSet<String>,
        previous: Option<&PropagationResult>,
        context: &InferenceContext<'_>,
        result: &mut PropagationResult,
    ) {
        let node = topology.nodes[v];
        let input = self.merged_input(topology, v, result);
        let specification = self.registry.get(&node.kind);
        let state = NodeState {
            kind: node.kind.clone(),
            input: input.clone(),
            content: node.content.clone(),
            external: specification
                .filter(|spec| spec.reads_external_input())
                .and(context.external_input)
                .cloned(),
        };

        if let Some(reused) = previous.filter(|_| !changed.contains(&node.id)).and_then(|prev| {
            let prev_state = prev.states.get(&node.id)?;
            let needs_update = match specification {
                Some(spec) => spec.needs_update(prev_state, &state),
                None => prev_state != &state,
            };
            (!needs_update).then(|| prev.nodes.get(&node.id)).flatten()
        }) {
            tracing::debug!(node_id = %node.id, "reusing memoized shapes");
            result.nodes.insert(node.id.clone(), reused.clone());
            result.states.insert(node.id.clone(), state);
            return;
        }

        let inference = match specification {
            Some(spec) => spec.infer_output(node, &input, context).unwrap_or_else(|err| {
                tracing::warn!(node_id = %node.id, %err, "malformed content, output typed as Any");
                Inference {
                    output: TypeShape::Any,
                    issues: vec![GraphIssue::MalformedContent {
                        node_id: node.id.clone(),
                        kind: node.kind.clone(),
                        message: err.to_string(),
                    }],
                }
            }),
            None => {
                tracing::warn!(node_id = %node.id, kind = %node.kind, "unknown kind, output typed as Any");
                Inference {
                    output: TypeShape::Any,
                    issues: vec![GraphIssue::UnknownKind {
                        node_id: node.id.clone(),
                        kind: node.kind.clone(),
                    }],
                }
            }
        };

        result.nodes.insert(
            node.id.clone(),
            NodeTypes {
                input,
                output: inference.output.truncated(MAX_SHAPE_DEPTH),
                issues: inference.issues,
            },
        );
        result.states.insert(node.id.clone(), state);
        result.recomputed.insert(node.id.clone());
    }

    /// Root nodes receive an empty object; other nodes receive the outputs
    /// of their upstream nodes merged in edge order.
    fn merged_input(&self, topology: &Topology<'_>, v: usize, result: &PropagationResult) -> TypeShape {
        topology.predecessors[v]
            .iter()
            .map(|&u| {
                result
                    .output(&topology.nodes[u].id)
                    .cloned()
                    .unwrap_or(TypeShape::Any)
            })
            .reduce(|merged, output| merged.merge(&output))
            .unwrap_or_else(TypeShape::empty_object)
    }
}

/// Propagates shapes through `graph` with the built-in registry, recomputing
/// every node. `changed` only determines the reported dirty set.
pub fn propagate_types(
    graph: &Graph,
    external_input: Option<&TypeShape>,
    changed: &BTreeSet<String>,
) -> PropagationResult {
    let mut builder = Propagator::builder();
    if let Some(shape) = external_input {
        builder = builder.with_external_input(shape.clone());
    }
    builder.build().propagate(graph, changed, None)
}
