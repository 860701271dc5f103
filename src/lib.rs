//! # jdm-graph - Structural Diff and Type Inference for Decision Graphs
//!
//! **jdm-graph** is the analysis core of a visual decision-graph editor working on
//! JSON Decision Model (JDM) graphs. It provides two pure engines:
//!
//! 1.  **Diff**: compares two snapshots of a graph and annotates the current one with
//!     a stable, field-level change report (added, removed, modified, moved), down to
//!     the rows of expression lists and decision tables.
//! 2.  **Type propagation**: walks the graph in dependency order and computes, for
//!     every node, the [`TypeShape`](types::TypeShape) of the data flowing in and out,
//!     so that node editors can offer type-aware autocompletion.
//!
//! Both engines are synchronous and stateless. They borrow their input snapshots,
//! never mutate them, and always return a complete result: malformed content, unknown
//! node kinds, cycles and invalid expressions are recovered locally and reported as
//! [`GraphIssue`](error::GraphIssue)s.
//!
//! ## Quick Start
//!
//! ```rust
//! use jdm_graph::prelude::*;
//! use serde_json::json;
//! use std::collections::BTreeSet;
//!
//! let previous = Graph::new(
//!     vec![Node::new("1", "expressionNode", "Totals", json!({
//!         "expressions": [{ "id": "r1", "key": "total", "value": "price * 2" }]
//!     }))],
//!     vec![],
//! );
//! let mut current = previous.clone();
//! current.nodes[0].content = json!({
//!     "expressions": [{ "id": "r1", "key": "total", "value": "price * 3" }]
//! });
//!
//! // 1. Diff the two snapshots.
//! let annotated = diff(&previous, &current);
//! let node = annotated.node("1").unwrap();
//! assert_eq!(node.diff.as_ref().unwrap().status, DiffStatus::Modified);
//!
//! // 2. Propagate types with a sample input shape.
//! let input = TypeShape::object([("price", TypeShape::number())]);
//! let changed = BTreeSet::from(["1".to_string()]);
//! let types = propagate_types(&current, Some(&input), &changed);
//! assert!(types.output("1").is_some());
//! ```

pub mod diff;
pub mod error;
pub mod expression;
pub mod graph;
pub mod prelude;
pub mod propagation;
pub mod registry;
pub mod types;

pub use diff::diff;
pub use propagation::propagate_types;
