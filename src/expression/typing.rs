use super::ast::{BinaryOp, Expression, Literal, UnaryOp};
use crate::error::ExpressionError;
use crate::types::{PathSegment, PrimitiveType, TypeShape};

/// Built-in functions with their accepted argument counts (min, max).
const BUILTINS: &[(&str, usize, usize)] = &[
    ("len", 1, 1),
    ("sum", 1, 1),
    ("avg", 1, 1),
    ("min", 1, 1),
    ("max", 1, 1),
    ("median", 1, 1),
    ("mode", 1, 1),
    ("abs", 1, 1),
    ("floor", 1, 1),
    ("ceil", 1, 1),
    ("round", 1, 2),
    ("rand", 1, 1),
    ("number", 1, 1),
    ("string", 1, 1),
    ("bool", 1, 1),
    ("upper", 1, 1),
    ("lower", 1, 1),
    ("trim", 1, 1),
    ("contains", 2, 2),
    ("startsWith", 2, 2),
    ("endsWith", 2, 2),
    ("matches", 2, 2),
    ("isNumeric", 1, 1),
    ("keys", 1, 1),
    ("values", 1, 1),
    ("flatten", 1, 1),
    ("map", 2, 2),
    ("filter", 2, 2),
    ("some", 2, 2),
    ("all", 2, 2),
    ("none", 2, 2),
    ("one", 2, 2),
    ("count", 2, 2),
    ("date", 0, 1),
    ("time", 0, 1),
    ("duration", 1, 1),
];

/// Computes the result shape of an expression without evaluating it.
///
/// Identifiers resolve against `root`; `#` resolves against the item shape of
/// the innermost closure argument (`map`, `filter`, ...).
pub(crate) struct TypeChecker<'a> {
    root: &'a TypeShape,
    pointer: Option<TypeShape>,
}

impl<'a> TypeChecker<'a> {
    pub(crate) fn new(root: &'a TypeShape) -> Self {
        Self {
            root,
            pointer: None,
        }
    }

    pub(crate) fn check(&self, expression: &Expression) -> Result<TypeShape, ExpressionError> {
        match expression {
            Expression::Literal(literal) => Ok(literal_shape(literal)),
            Expression::Identifier(name) => Ok(self.root.child(&PathSegment::Key(name.clone()))),
            Expression::Pointer => Ok(self.pointer.clone().unwrap_or(TypeShape::Any)),
            Expression::Member(target, name) => {
                Ok(self.check(target)?.child(&PathSegment::Key(name.clone())))
            }
            Expression::Index(target, index) => self.check_index(target, index),
            Expression::Array(items) => {
                let shapes = items
                    .iter()
                    .map(|item| self.check(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(TypeShape::array(TypeShape::union(shapes)))
            }
            Expression::Object(fields) => {
                let mut shape = TypeShape::empty_object();
                for (key, value) in fields {
                    shape.set_segments(&[PathSegment::Key(key.clone())], self.check(value)?);
                }
                Ok(shape)
            }
            Expression::Unary(op, operand) => {
                let operand = self.check(operand)?;
                match op {
                    UnaryOp::Not => Ok(TypeShape::bool()),
                    UnaryOp::Negate if operand.is_any() => Ok(TypeShape::Any),
                    UnaryOp::Negate if is_arithmetic(&operand) => Ok(TypeShape::number()),
                    UnaryOp::Negate => Err(invalid_operand("-", &operand)),
                }
            }
            Expression::Binary(op, left, right) => {
                let left = self.check(left)?;
                let right = self.check(right)?;
                binary_shape(*op, left, right)
            }
            Expression::Conditional(condition, then, otherwise) => {
                self.check(condition)?;
                Ok(TypeShape::union([self.check(then)?, self.check(otherwise)?]))
            }
            Expression::Call(name, args) => self.check_call(name, args),
        }
    }

    fn check_index(
        &self,
        target: &Expression,
        index: &Expression,
    ) -> Result<TypeShape, ExpressionError> {
        let target = self.check(target)?;
        let segment = match index {
            Expression::Literal(Literal::String(key)) => PathSegment::Key(key.clone()),
            Expression::Literal(Literal::Number(n)) if *n >= 0.0 => PathSegment::Index(*n as usize),
            dynamic => {
                let index = self.check(dynamic)?;
                return Ok(match (&target, index.is_string()) {
                    (TypeShape::Object(fields), true) => {
                        TypeShape::union(fields.values().cloned())
                    }
                    (TypeShape::Object(_), false) => TypeShape::Any,
                    _ => target.child(&PathSegment::Index(0)),
                });
            }
        };
        Ok(target.child(&segment))
    }

    fn check_call(&self, name: &str, args: &[Expression]) -> Result<TypeShape, ExpressionError> {
        let Some(&(_, min, max)) = BUILTINS.iter().find(|(builtin, _, _)| *builtin == name) else {
            return Err(ExpressionError::UnknownFunction(name.to_string()));
        };
        if args.len() < min || args.len() > max {
            return Err(ExpressionError::ArgumentCount {
                name: name.to_string(),
                expected: if args.len() < min { min } else { max },
                found: args.len(),
            });
        }

        if matches!(
            name,
            "map" | "filter" | "some" | "all" | "none" | "one" | "count"
        ) {
            return self.check_closure(name, &args[0], &args[1]);
        }

        let shapes = args
            .iter()
            .map(|arg| self.check(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let first = shapes.first().cloned().unwrap_or(TypeShape::Any);

        Ok(match name {
            "len" | "sum" | "avg" | "min" | "max" | "median" | "mode" | "abs" | "floor"
            | "ceil" | "round" | "rand" | "number" | "time" | "duration" => TypeShape::number(),
            "string" | "upper" | "lower" | "trim" => TypeShape::string(),
            "bool" | "contains" | "startsWith" | "endsWith" | "matches" | "isNumeric" => {
                TypeShape::bool()
            }
            "date" => TypeShape::date(),
            "keys" => TypeShape::array(TypeShape::string()),
            "values" => match first {
                TypeShape::Object(fields) => {
                    TypeShape::array(TypeShape::union(fields.into_values()))
                }
                _ => TypeShape::array(TypeShape::Any),
            },
            "flatten" => {
                let item = first.array_item();
                match item {
                    TypeShape::Array(_) => item,
                    TypeShape::Any => TypeShape::array(TypeShape::Any),
                    other => TypeShape::array(other),
                }
            }
            _ => TypeShape::Any,
        })
    }

    /// Types a closure call: the body is checked with `#` bound to the
    /// item shape of the collection argument.
    fn check_closure(
        &self,
        name: &str,
        collection: &Expression,
        body: &Expression,
    ) -> Result<TypeShape, ExpressionError> {
        let collection = self.check(collection)?;
        let scoped = TypeChecker {
            root: self.root,
            pointer: Some(collection.array_item()),
        };
        let body = scoped.check(body)?;

        Ok(match name {
            "map" => TypeShape::array(body),
            "filter" => match collection {
                TypeShape::Array(_) => collection,
                _ => TypeShape::array(TypeShape::Any),
            },
            "count" => TypeShape::number(),
            _ => TypeShape::bool(),
        })
    }
}

fn literal_shape(literal: &Literal) -> TypeShape {
    match literal {
        Literal::Number(_) => TypeShape::number(),
        Literal::String(_) => TypeShape::string(),
        Literal::Bool(_) => TypeShape::bool(),
        Literal::Null => TypeShape::null(),
    }
}

fn binary_shape(
    op: BinaryOp,
    left: TypeShape,
    right: TypeShape,
) -> Result<TypeShape, ExpressionError> {
    match op {
        BinaryOp::Add if left.is_string() || right.is_string() => Ok(TypeShape::string()),
        BinaryOp::Add
        | BinaryOp::Subtract
        | BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::Modulo
        | BinaryOp::Power => {
            if left.is_any() || right.is_any() {
                return Ok(TypeShape::Any);
            }
            for operand in [&left, &right] {
                if !is_arithmetic(operand) {
                    return Err(invalid_operand(op.symbol(), operand));
                }
            }
            Ok(TypeShape::number())
        }
        BinaryOp::Equal
        | BinaryOp::NotEqual
        | BinaryOp::Less
        | BinaryOp::LessOrEqual
        | BinaryOp::Greater
        | BinaryOp::GreaterOrEqual
        | BinaryOp::In
        | BinaryOp::NotIn
        | BinaryOp::And
        | BinaryOp::Or => Ok(TypeShape::bool()),
        BinaryOp::Coalesce => Ok(TypeShape::union([without_null(left), right])),
    }
}

/// Numbers, dates and nullable variants of them take part in arithmetic.
fn is_arithmetic(shape: &TypeShape) -> bool {
    match shape {
        TypeShape::Any => true,
        TypeShape::Primitive(primitive) => matches!(
            primitive,
            PrimitiveType::Number | PrimitiveType::Date | PrimitiveType::Null
        ),
        TypeShape::Union(members) => members.iter().all(is_arithmetic),
        _ => false,
    }
}

fn without_null(shape: TypeShape) -> TypeShape {
    match shape {
        TypeShape::Union(members) => {
            TypeShape::union(members.into_iter().filter(|m| *m != TypeShape::null()))
        }
        other => other,
    }
}

fn invalid_operand(operator: &str, found: &TypeShape) -> ExpressionError {
    ExpressionError::InvalidOperand {
        operator: operator.to_string(),
        found: found.to_string(),
    }
}
