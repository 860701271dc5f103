//! Common test utilities for building decision graphs.
use jdm_graph::prelude::*;
use serde_json::{Value, json};
use std::collections::BTreeSet;

/// Content of an expression node whose rows carry no ids.
#[allow(dead_code)]
pub fn expression_content(rows: &[(&str, &str)]) -> Value {
    let expressions: Vec<Value> = rows
        .iter()
        .map(|(key, value)| json!({ "key": key, "value": value }))
        .collect();
    json!({ "expressions": expressions })
}

/// Content of an expression node whose rows are keyed by id.
#[allow(dead_code)]
pub fn keyed_expression_content(rows: &[(&str, &str, &str)]) -> Value {
    let expressions: Vec<Value> = rows
        .iter()
        .map(|(id, key, value)| json!({ "id": id, "key": key, "value": value }))
        .collect();
    json!({ "expressions": expressions })
}

#[allow(dead_code)]
pub fn expression_node(id: &str, rows: &[(&str, &str)]) -> Node {
    Node::new(id, "expressionNode", id, expression_content(rows))
}

/// A decision table with one output column writing to `field`, one rule per
/// output cell.
#[allow(dead_code)]
pub fn table_node(id: &str, field: &str, cells: &[&str]) -> Node {
    let rules: Vec<Value> = cells
        .iter()
        .enumerate()
        .map(|(i, cell)| json!({ "_id": format!("r{}", i), "out": cell }))
        .collect();
    Node::new(
        id,
        "decisionTableNode",
        id,
        json!({
            "hitPolicy": "first",
            "inputs": [{ "id": "in", "name": "Input", "field": "value" }],
            "outputs": [{ "id": "out", "name": "Output", "field": field }],
            "rules": rules,
        }),
    )
}

/// Edges `ids[0] -> ids[1] -> ... -> ids[n]`.
#[allow(dead_code)]
pub fn chain(ids: &[&str]) -> Vec<Edge> {
    ids.windows(2)
        .map(|pair| Edge::new(&format!("{}-{}", pair[0], pair[1]), pair[0], pair[1]))
        .collect()
}

/// A small but complete graph:
///
/// `request -> totals (expression) -> tiers (table) -> response`
#[allow(dead_code)]
pub fn create_sample_graph() -> Graph {
    Graph::new(
        vec![
            Node::new("request", "inputNode", "Request", json!({})).at(0.0, 0.0),
            expression_node("totals", &[("total", "price * quantity"), ("label", "name + '!'")])
                .at(200.0, 0.0),
            table_node("tiers", "tier", &["'gold'", "'silver'"]).at(400.0, 0.0),
            Node::new("response", "outputNode", "Response", json!({})).at(600.0, 0.0),
        ],
        chain(&["request", "totals", "tiers", "response"]),
    )
}

/// The shape of the request fed to [`create_sample_graph`].
#[allow(dead_code)]
pub fn create_sample_input() -> TypeShape {
    TypeShape::object([
        ("price", TypeShape::number()),
        ("quantity", TypeShape::number()),
        ("name", TypeShape::string()),
    ])
}

#[allow(dead_code)]
pub fn ids(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}
