//! The expression language used in expression rows, decision table cells and
//! switch conditions, reduced to what symbolic typing needs: a lexer, a Pratt
//! parser producing an [`Expression`] tree, and a type checker that computes
//! the result shape of an expression against an input [`TypeShape`].

pub mod ast;
mod lexer;
pub mod parser;
mod typing;

pub use ast::{BinaryOp, Expression, Literal, UnaryOp};
pub use parser::{MAX_EXPRESSION_DEPTH, parse};

use crate::error::ExpressionError;
use crate::types::TypeShape;

/// Parses `source` and returns the shape of its result when evaluated against
/// a value of shape `root`.
pub fn calculate_type(root: &TypeShape, source: &str) -> Result<TypeShape, ExpressionError> {
    let expression = parse(source)?;
    typing::TypeChecker::new(root).check(&expression)
}
