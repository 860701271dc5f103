use crate::graph::{Graph, Node};
use ahash::AHashMap;
use std::collections::VecDeque;

/// Adjacency of the data-flow edges, by node position.
///
/// Only the first node of a duplicated id takes part; edges with a missing
/// endpoint are dropped.
pub(crate) struct Topology<'g> {
    pub nodes: Vec<&'g Node>,
    pub index: AHashMap<&'g str, usize>,
    /// Upstream nodes in edge order, which is also the merge order of inputs.
    pub predecessors: Vec<Vec<usize>>,
    pub successors: Vec<Vec<usize>>,
}

impl<'g> Topology<'g> {
    pub(crate) fn new(graph: &'g Graph) -> Self {
        let mut nodes = Vec::with_capacity(graph.nodes.len());
        let mut index = AHashMap::with_capacity(graph.nodes.len());
        for node in &graph.nodes {
            if index.contains_key(node.id.as_str()) {
                tracing::warn!(node_id = %node.id, "duplicate node id ignored during propagation");
                continue;
            }
            index.insert(node.id.as_str(), nodes.len());
            nodes.push(node);
        }

        let mut predecessors = vec![Vec::new(); nodes.len()];
        let mut successors = vec![Vec::new(); nodes.len()];
        for edge in &graph.edges {
            match (
                index.get(edge.source_id.as_str()),
                index.get(edge.target_id.as_str()),
            ) {
                (Some(&source), Some(&target)) => {
                    predecessors[target].push(source);
                    successors[source].push(target);
                }
                _ => tracing::warn!(edge_id = %edge.id, "ignoring edge with a missing endpoint"),
            }
        }

        Self {
            nodes,
            index,
            predecessors,
            successors,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Marks `seeds` and everything reachable downstream of them.
    pub(crate) fn downstream_closure(&self, seeds: impl IntoIterator<Item = usize>) -> Vec<bool> {
        let mut reached = vec![false; self.len()];
        let mut queue: VecDeque<usize> = VecDeque::new();
        for seed in seeds {
            if !reached[seed] {
                reached[seed] = true;
                queue.push_back(seed);
            }
        }
        while let Some(v) = queue.pop_front() {
            for &w in &self.successors[v] {
                if !reached[w] {
                    reached[w] = true;
                    queue.push_back(w);
                }
            }
        }
        reached
    }
}

/// Kahn's algorithm, driven one node at a time so that the caller can
/// compute each node before its successors are released.
pub(crate) struct KahnOrder {
    pending: Vec<usize>,
    ready: VecDeque<usize>,
    resolved: Vec<bool>,
}

impl KahnOrder {
    pub(crate) fn new(topology: &Topology<'_>) -> Self {
        let pending: Vec<usize> = topology.predecessors.iter().map(Vec::len).collect();
        let ready = (0..topology.len()).filter(|&v| pending[v] == 0).collect();
        Self {
            pending,
            ready,
            resolved: vec![false; topology.len()],
        }
    }

    pub(crate) fn next(&mut self) -> Option<usize> {
        self.ready.pop_front()
    }

    /// Records `v` as computed and releases successors with no pending input.
    pub(crate) fn resolve(&mut self, topology: &Topology<'_>, v: usize) {
        self.resolved[v] = true;
        self.release(topology, v);
    }

    /// Records a whole cycle as resolved at once, so that no member of it is
    /// released as if it were ready.
    pub(crate) fn resolve_cycle(&mut self, topology: &Topology<'_>, cycle: &[usize]) {
        for &v in cycle {
            self.resolved[v] = true;
        }
        for &v in cycle {
            self.release(topology, v);
        }
    }

    fn release(&mut self, topology: &Topology<'_>, v: usize) {
        for &w in &topology.successors[v] {
            if self.resolved[w] {
                continue;
            }
            self.pending[w] -= 1;
            if self.pending[w] == 0 {
                self.ready.push_back(w);
            }
        }
    }

    pub(crate) fn is_resolved(&self, v: usize) -> bool {
        self.resolved[v]
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.resolved.iter().all(|&r| r)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Stale,
    Computing,
    Fresh,
}

/// Finds the cycles among the nodes Kahn's algorithm could not order.
///
/// This is Tarjan's strongly-connected-components walk with an explicit
/// stack: a node is `Computing` while it is on the walk's stack, and reaching
/// a `Computing` node again closes a cycle. Returns the node sets that lie on
/// a cycle (components with more than one node, or a self-loop), each sorted.
pub(crate) fn find_cycles(topology: &Topology<'_>, order: &KahnOrder) -> Vec<Vec<usize>> {
    let n = topology.len();
    let mut state = vec![Visit::Stale; n];
    let mut discovered = vec![0usize; n];
    let mut low = vec![0usize; n];
    let mut counter = 0;
    let mut on_stack: Vec<usize> = Vec::new();
    let mut cycles = Vec::new();

    for root in 0..n {
        if order.is_resolved(root) || state[root] != Visit::Stale {
            continue;
        }

        let mut work: Vec<(usize, usize)> = vec![(root, 0)];
        discovered[root] = counter;
        low[root] = counter;
        counter += 1;
        state[root] = Visit::Computing;
        on_stack.push(root);

        while let Some(&(v, position)) = work.last() {
            match topology.successors[v].get(position) {
                Some(&w) => {
                    if let Some(frame) = work.last_mut() {
                        frame.1 += 1;
                    }
                    if order.is_resolved(w) {
                        continue;
                    }
                    match state[w] {
                        Visit::Stale => {
                            discovered[w] = counter;
                            low[w] = counter;
                            counter += 1;
                            state[w] = Visit::Computing;
                            on_stack.push(w);
                            work.push((w, 0));
                        }
                        Visit::Computing => low[v] = low[v].min(discovered[w]),
                        Visit::Fresh => {}
                    }
                }
                None => {
                    work.pop();
                    if let Some(&(parent, _)) = work.last() {
                        low[parent] = low[parent].min(low[v]);
                    }
                    if low[v] != discovered[v] {
                        continue;
                    }

                    let mut component = Vec::new();
                    while let Some(w) = on_stack.pop() {
                        state[w] = Visit::Fresh;
                        component.push(w);
                        if w == v {
                            break;
                        }
                    }
                    if component.len() > 1 || topology.successors[v].contains(&v) {
                        component.sort_unstable();
                        cycles.push(component);
                    }
                }
            }
        }
    }

    cycles.sort();
    cycles
}
