use super::shape::{MAX_SHAPE_DEPTH, TypeShape};
use serde_json::Value;

impl TypeShape {
    /// Infers the shape of a concrete sample value, such as the live input
    /// data a user pastes into the simulator.
    ///
    /// Array items are merged into one item shape, so an array of objects with
    /// differing keys yields a single object shape holding every key.
    pub fn from_sample(value: &Value) -> TypeShape {
        sample_shape(value, MAX_SHAPE_DEPTH)
    }

    /// Converts a JSON Schema document (as stored on request/response nodes)
    /// into a shape. Unsupported constructs resolve to `Any`.
    pub fn from_json_schema(schema: &Value) -> TypeShape {
        schema_shape(schema, MAX_SHAPE_DEPTH)
    }
}

fn sample_shape(value: &Value, depth: usize) -> TypeShape {
    if depth == 0 {
        return TypeShape::Any;
    }
    match value {
        Value::Null => TypeShape::null(),
        Value::Bool(_) => TypeShape::bool(),
        Value::Number(_) => TypeShape::number(),
        Value::String(_) => TypeShape::string(),
        Value::Array(items) => {
            let item = items
                .iter()
                .map(|item| sample_shape(item, depth - 1))
                .reduce(|acc, shape| acc.merge(&shape))
                .unwrap_or(TypeShape::Any);
            TypeShape::array(item)
        }
        Value::Object(fields) => TypeShape::object(
            fields
                .iter()
                .map(|(key, value)| (key.as_str(), sample_shape(value, depth - 1))),
        ),
    }
}

fn schema_shape(schema: &Value, depth: usize) -> TypeShape {
    if depth == 0 {
        return TypeShape::Any;
    }
    let Some(schema) = schema.as_object() else {
        return TypeShape::Any;
    };

    for combinator in ["anyOf", "oneOf"] {
        if let Some(Value::Array(variants)) = schema.get(combinator) {
            return TypeShape::union(variants.iter().map(|v| schema_shape(v, depth - 1)));
        }
    }

    match schema.get("type") {
        Some(Value::String(name)) => named_type_shape(name, schema, depth),
        Some(Value::Array(names)) => TypeShape::union(
            names
                .iter()
                .filter_map(Value::as_str)
                .map(|name| named_type_shape(name, schema, depth)),
        ),
        _ if schema.contains_key("properties") => named_type_shape("object", schema, depth),
        _ if schema.contains_key("items") => named_type_shape("array", schema, depth),
        _ => TypeShape::Any,
    }
}

fn named_type_shape(
    name: &str,
    schema: &serde_json::Map<String, Value>,
    depth: usize,
) -> TypeShape {
    match name {
        "object" => match schema.get("properties").and_then(Value::as_object) {
            Some(properties) => TypeShape::object(
                properties
                    .iter()
                    .map(|(key, property)| (key.as_str(), schema_shape(property, depth - 1))),
            ),
            None => TypeShape::empty_object(),
        },
        "array" => TypeShape::array(
            schema
                .get("items")
                .map(|items| schema_shape(items, depth - 1))
                .unwrap_or(TypeShape::Any),
        ),
        "string" => match schema.get("format").and_then(Value::as_str) {
            Some("date" | "date-time") => TypeShape::date(),
            _ => TypeShape::string(),
        },
        "number" | "integer" => TypeShape::number(),
        "boolean" => TypeShape::bool(),
        "null" => TypeShape::null(),
        _ => TypeShape::Any,
    }
}
