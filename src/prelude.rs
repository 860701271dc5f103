//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and functions of the crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use jdm_graph::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let previous = Graph::from_json(&std::fs::read_to_string("path/to/previous.json")?)?;
//! let current = Graph::from_json(&std::fs::read_to_string("path/to/current.json")?)?;
//!
//! let annotated = Differ::builder().with_position_threshold(20.0).build().diff(&previous, &current);
//! println!("{:?}", annotated.summary());
//! # Ok(())
//! # }
//! ```

// Engines
pub use crate::diff::{Differ, diff};
pub use crate::propagation::{Propagator, propagate_types};

// Graph model
pub use crate::graph::{Edge, Graph, Node, NodeKind, Position};

// Diff results
pub use crate::diff::{AnnotatedEdge, AnnotatedGraph, AnnotatedNode, DiffMetadata, DiffStatus, FieldDiff};

// Type model
pub use crate::propagation::{NodeTypes, PropagationResult};
pub use crate::types::{PrimitiveType, TypeShape};

// Extension points
pub use crate::registry::{NodeRegistry, NodeSpecification};

// Error types
pub use crate::error::{ExpressionError, GraphError, GraphIssue};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
