use super::path::{PathSegment, parse_path};
use crate::error::ExpressionError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Shapes nested deeper than this are truncated to `Any`.
pub const MAX_SHAPE_DEPTH: usize = 64;

/// The scalar kinds a value can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveType {
    Null,
    Bool,
    Number,
    String,
    Date,
}

/// A structural description of the set of values that can appear at a point
/// in the graph.
///
/// Shapes are plain values: equality, ordering and hashing are structural, and
/// every operation either returns a new shape or mutates a working copy that
/// the caller explicitly passes as `&mut self`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeShape {
    #[default]
    Any,
    Primitive(PrimitiveType),
    Array(Box<TypeShape>),
    Object(BTreeMap<String, TypeShape>),
    Union(BTreeSet<TypeShape>),
}

impl TypeShape {
    pub fn null() -> Self {
        TypeShape::Primitive(PrimitiveType::Null)
    }

    pub fn bool() -> Self {
        TypeShape::Primitive(PrimitiveType::Bool)
    }

    pub fn number() -> Self {
        TypeShape::Primitive(PrimitiveType::Number)
    }

    pub fn string() -> Self {
        TypeShape::Primitive(PrimitiveType::String)
    }

    pub fn date() -> Self {
        TypeShape::Primitive(PrimitiveType::Date)
    }

    pub fn empty_object() -> Self {
        TypeShape::Object(BTreeMap::new())
    }

    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, TypeShape)>,
    {
        TypeShape::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn array(item: TypeShape) -> Self {
        TypeShape::Array(Box::new(item))
    }

    /// Builds a normalized union: nested unions are flattened, duplicates
    /// removed, `Any` absorbs everything and a single member is unwrapped.
    pub fn union<I: IntoIterator<Item = TypeShape>>(members: I) -> Self {
        let mut set = BTreeSet::new();
        for member in members {
            match member {
                TypeShape::Any => return TypeShape::Any,
                TypeShape::Union(inner) => set.extend(inner),
                other => {
                    set.insert(other);
                }
            }
        }

        if set.len() == 1 {
            if let Some(only) = set.pop_first() {
                return only;
            }
        }
        if set.is_empty() {
            return TypeShape::Any;
        }
        TypeShape::Union(set)
    }

    pub fn is_any(&self) -> bool {
        matches!(self, TypeShape::Any)
    }

    /// True when every value of this shape is a number (or may be, for `Any`).
    pub fn is_numeric(&self) -> bool {
        match self {
            TypeShape::Any | TypeShape::Primitive(PrimitiveType::Number) => true,
            TypeShape::Union(members) => members.iter().all(TypeShape::is_numeric),
            _ => false,
        }
    }

    pub fn is_string(&self) -> bool {
        match self {
            TypeShape::Primitive(PrimitiveType::String) => true,
            TypeShape::Union(members) => members.iter().all(TypeShape::is_string),
            _ => false,
        }
    }

    /// Resolves a dot/bracket path. Unknown or invalid paths resolve to `Any`.
    pub fn get(&self, path: &str) -> TypeShape {
        match parse_path(path) {
            Ok(segments) => self.get_segments(&segments),
            Err(err) => {
                tracing::debug!(path, %err, "unresolvable path, falling back to Any");
                TypeShape::Any
            }
        }
    }

    pub fn get_segments(&self, segments: &[PathSegment]) -> TypeShape {
        let Some((first, rest)) = segments.split_first() else {
            return self.clone();
        };
        rest.iter()
            .fold(self.child(first), |current, segment| current.child(segment))
    }

    /// The shape reached by a single path step.
    pub fn child(&self, segment: &PathSegment) -> TypeShape {
        match (self, segment) {
            (TypeShape::Object(fields), PathSegment::Key(key)) => {
                fields.get(key).cloned().unwrap_or(TypeShape::Any)
            }
            (TypeShape::Array(item), PathSegment::Index(_)) => (**item).clone(),
            (TypeShape::Primitive(PrimitiveType::String), PathSegment::Index(_)) => {
                TypeShape::string()
            }
            (TypeShape::Union(members), _) => {
                TypeShape::union(members.iter().map(|member| member.child(segment)))
            }
            _ => TypeShape::Any,
        }
    }

    /// Writes `value` at `path`, creating intermediate objects (and arrays for
    /// index segments) as needed. Invalid paths leave the shape untouched.
    pub fn set(&mut self, path: &str, value: TypeShape) {
        match parse_path(path) {
            Ok(segments) => self.set_segments(&segments, value),
            Err(err) => tracing::debug!(path, %err, "ignoring write to an invalid path"),
        }
    }

    pub fn set_segments(&mut self, segments: &[PathSegment], value: TypeShape) {
        let mut current = self;
        for segment in segments {
            current = match segment {
                PathSegment::Key(key) => current
                    .coerce_object()
                    .entry(key.clone())
                    .or_insert(TypeShape::Any),
                PathSegment::Index(_) => current.coerce_array_item(),
            };
        }
        *current = value;
    }

    fn coerce_object(&mut self) -> &mut BTreeMap<String, TypeShape> {
        if !matches!(self, TypeShape::Object(_)) {
            *self = TypeShape::empty_object();
        }
        match self {
            TypeShape::Object(fields) => fields,
            _ => unreachable!("shape was coerced to an object"),
        }
    }

    fn coerce_array_item(&mut self) -> &mut TypeShape {
        if !matches!(self, TypeShape::Array(_)) {
            *self = TypeShape::array(TypeShape::Any);
        }
        match self {
            TypeShape::Array(item) => &mut **item,
            _ => unreachable!("shape was coerced to an array"),
        }
    }

    /// Combines two shapes describing the same value.
    ///
    /// Objects are merged key-wise (recursively for nested objects); keys whose
    /// shapes disagree become a union. `Any` contributes no information and
    /// yields the other side.
    pub fn merge(&self, other: &TypeShape) -> TypeShape {
        match (self, other) {
            (TypeShape::Any, shape) | (shape, TypeShape::Any) => shape.clone(),
            (TypeShape::Object(left), TypeShape::Object(right)) => {
                let mut merged = left.clone();
                for (key, right_shape) in right {
                    let combined = match left.get(key) {
                        Some(left_shape) => merge_field(left_shape, right_shape),
                        None => right_shape.clone(),
                    };
                    merged.insert(key.clone(), combined);
                }
                TypeShape::Object(merged)
            }
            (left, right) if left == right => left.clone(),
            (left, right) => TypeShape::union([left.clone(), right.clone()]),
        }
    }

    /// Unwraps one array level. Anything that is not an array yields `Any`,
    /// since its items are unknown.
    pub fn array_item(&self) -> TypeShape {
        match self {
            TypeShape::Array(item) => (**item).clone(),
            TypeShape::Union(members) => {
                TypeShape::union(members.iter().map(TypeShape::array_item))
            }
            _ => TypeShape::Any,
        }
    }

    pub fn into_array(self) -> TypeShape {
        TypeShape::array(self)
    }

    /// Symbolically evaluates `expression` against this shape and returns the
    /// shape of its result. Invalid expressions yield `Any`.
    pub fn calculate_type(&self, expression: &str) -> TypeShape {
        self.try_calculate_type(expression).unwrap_or_else(|err| {
            tracing::debug!(expression, %err, "expression could not be typed");
            TypeShape::Any
        })
    }

    pub fn try_calculate_type(&self, expression: &str) -> Result<TypeShape, ExpressionError> {
        crate::expression::calculate_type(self, expression)
    }

    /// Replaces everything nested deeper than `max_depth` with `Any`.
    pub fn truncated(&self, max_depth: usize) -> TypeShape {
        if max_depth == 0 {
            return TypeShape::Any;
        }
        match self {
            TypeShape::Array(item) => TypeShape::array(item.truncated(max_depth - 1)),
            TypeShape::Object(fields) => TypeShape::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.truncated(max_depth - 1)))
                    .collect(),
            ),
            TypeShape::Union(members) => {
                TypeShape::union(members.iter().map(|m| m.truncated(max_depth)))
            }
            other => other.clone(),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            TypeShape::Array(item) => 1 + item.depth(),
            TypeShape::Object(fields) => 1 + fields.values().map(TypeShape::depth).max().unwrap_or(0),
            TypeShape::Union(members) => members.iter().map(TypeShape::depth).max().unwrap_or(0),
            _ => 0,
        }
    }
}

fn merge_field(left: &TypeShape, right: &TypeShape) -> TypeShape {
    match (left, right) {
        (TypeShape::Object(_), TypeShape::Object(_)) => left.merge(right),
        (l, r) if l == r => l.clone(),
        (l, r) => TypeShape::union([l.clone(), r.clone()]),
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveType::Null => "null",
            PrimitiveType::Bool => "boolean",
            PrimitiveType::Number => "number",
            PrimitiveType::String => "string",
            PrimitiveType::Date => "date",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeShape::Any => write!(f, "any"),
            TypeShape::Primitive(primitive) => write!(f, "{}", primitive),
            TypeShape::Array(item) => match **item {
                TypeShape::Union(_) => write!(f, "({})[]", item),
                _ => write!(f, "{}[]", item),
            },
            TypeShape::Object(fields) if fields.is_empty() => write!(f, "{{}}"),
            TypeShape::Object(fields) => {
                write!(f, "{{ ")?;
                for (i, (key, shape)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}: {}", key, shape)?;
                }
                write!(f, " }}")
            }
            TypeShape::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", member)?;
                }
                Ok(())
            }
        }
    }
}
