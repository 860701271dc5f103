//! Tests for the type propagation engine.
mod common;

use common::*;
use jdm_graph::diff::ContentDiff;
use jdm_graph::error::ContentError;
use jdm_graph::prelude::{
    Edge, Graph, GraphIssue, Node, NodeRegistry, NodeSpecification, PropagationResult, Propagator,
    TypeShape, propagate_types,
};
use jdm_graph::registry::{Inference, InferenceContext};
use serde_json::{Value, json};
use std::collections::BTreeSet;

fn input_node(id: &str) -> Node {
    Node::new(id, "inputNode", id, json!({}))
}

fn output_node(id: &str) -> Node {
    Node::new(id, "outputNode", id, json!({}))
}

fn propagate_all(graph: &Graph, external_input: Option<&TypeShape>) -> PropagationResult {
    let changed = graph.nodes.iter().map(|n| n.id.clone()).collect();
    propagate_types(graph, external_input, &changed)
}

#[test]
fn test_sample_graph_chain() {
    let graph = create_sample_graph();
    let result = propagate_all(&graph, Some(&create_sample_input()));

    assert_eq!(result.output("request"), Some(&create_sample_input()));
    assert_eq!(result.input("totals"), Some(&create_sample_input()));
    assert_eq!(
        result.output("totals"),
        Some(&TypeShape::object([
            ("label", TypeShape::string()),
            ("total", TypeShape::number()),
        ]))
    );
    assert_eq!(
        result.output("tiers"),
        Some(&TypeShape::object([("tier", TypeShape::string())]))
    );
    assert_eq!(result.input("response"), result.output("tiers"));
    assert!(result.issues.is_empty());
    assert_eq!(result.recomputed.len(), 4);
}

#[test]
fn test_root_nodes_receive_an_empty_object() {
    let graph = Graph::new(vec![expression_node("calc", &[("x", "1")])], vec![]);
    let result = propagate_all(&graph, None);

    assert_eq!(result.input("calc"), Some(&TypeShape::empty_object()));
    assert_eq!(
        result.output("calc"),
        Some(&TypeShape::object([("x", TypeShape::number())]))
    );
}

#[test]
fn test_loop_mode_maps_each_item() {
    let item = TypeShape::object([("x", TypeShape::number())]);
    let mut content = expression_content(&[("out", "x")]);
    content["executionMode"] = json!("loop");

    let graph = Graph::new(
        vec![
            input_node("request"),
            Node::new("each", "expressionNode", "each", content),
        ],
        chain(&["request", "each"]),
    );
    let result = propagate_all(&graph, Some(&TypeShape::array(item)));

    assert_eq!(
        result.output("each"),
        Some(&TypeShape::array(TypeShape::object([(
            "out",
            TypeShape::number()
        )])))
    );
}

#[test]
fn test_rows_see_earlier_rows_through_dollar() {
    let graph = Graph::new(
        vec![
            input_node("request"),
            expression_node(
                "calc",
                &[("total", "price * quantity"), ("doubled", "$.total * 2")],
            ),
        ],
        chain(&["request", "calc"]),
    );
    let result = propagate_all(&graph, Some(&create_sample_input()));

    assert_eq!(
        result.output("calc"),
        Some(&TypeShape::object([
            ("doubled", TypeShape::number()),
            ("total", TypeShape::number()),
        ]))
    );
}

#[test]
fn test_mapping_options() {
    let input = TypeShape::object([
        ("customer", TypeShape::object([("age", TypeShape::number())])),
        ("name", TypeShape::string()),
    ]);

    let mut picked = expression_content(&[("adult", "age >= 18")]);
    picked["inputField"] = json!("customer");
    picked["outputPath"] = json!("result.flags");

    let mut merged = expression_content(&[("greeting", "'hi ' + name")]);
    merged["passThrough"] = json!(true);

    let graph = Graph::new(
        vec![
            input_node("request"),
            Node::new("picked", "expressionNode", "picked", picked),
            Node::new("merged", "expressionNode", "merged", merged),
        ],
        vec![
            Edge::new("e1", "request", "picked"),
            Edge::new("e2", "request", "merged"),
        ],
    );
    let result = propagate_all(&graph, Some(&input));

    assert_eq!(
        result.output("picked").unwrap().to_string(),
        "{ result: { flags: { adult: boolean } } }"
    );
    let merged = result.output("merged").unwrap();
    assert_eq!(merged.get("greeting"), TypeShape::string());
    assert_eq!(merged.get("customer.age"), TypeShape::number());
    assert_eq!(merged.get("name"), TypeShape::string());
}

#[test]
fn test_decision_table_output_is_union_of_cells() {
    let graph = Graph::new(
        vec![input_node("request"), table_node("table", "score", &["10", "'n/a'", " "])],
        chain(&["request", "table"]),
    );
    let result = propagate_all(&graph, Some(&create_sample_input()));

    assert_eq!(
        result.output("table"),
        Some(&TypeShape::object([(
            "score",
            TypeShape::union([TypeShape::number(), TypeShape::string()])
        )]))
    );
}

#[test]
fn test_collect_hit_policy_yields_an_array() {
    let mut table = table_node("table", "tier", &["'gold'", "'silver'"]);
    table.content["hitPolicy"] = json!("collect");
    let graph = Graph::new(vec![table], vec![]);

    let result = propagate_all(&graph, None);
    assert_eq!(
        result.output("table").unwrap().to_string(),
        "{ tier: string }[]"
    );
}

#[test]
fn test_pass_through_kinds() {
    let graph = Graph::new(
        vec![
            input_node("request"),
            Node::new("switch", "switchNode", "switch", json!({ "statements": [] })),
            Node::new("custom", "customNode", "custom", json!({ "kind": "x" })),
            Node::new("call", "decisionNode", "call", json!({ "key": "other.json" })),
            Node::new("code", "functionNode", "code", json!("export const handler = () => 1;")),
        ],
        chain(&["request", "switch", "custom", "call", "code"]),
    );
    let input = create_sample_input();
    let result = propagate_all(&graph, Some(&input));

    assert_eq!(result.output("switch"), Some(&input));
    assert_eq!(result.output("custom"), Some(&input));
    assert_eq!(result.output("call"), Some(&TypeShape::Any));
    assert_eq!(result.output("code"), Some(&TypeShape::Any));
    assert!(result.issues.is_empty());
}

#[test]
fn test_input_schema_is_used_without_external_input() {
    let schema = json!({
        "type": "object",
        "properties": { "amount": { "type": "number" } }
    })
    .to_string();
    let graph = Graph::new(
        vec![Node::new("request", "inputNode", "request", json!({ "schema": schema }))],
        vec![],
    );

    let result = propagate_all(&graph, None);
    assert_eq!(
        result.output("request"),
        Some(&TypeShape::object([("amount", TypeShape::number())]))
    );

    let external = TypeShape::object([("other", TypeShape::bool())]);
    let result = propagate_all(&graph, Some(&external));
    assert_eq!(result.output("request"), Some(&external));
}

#[test]
fn test_multiple_inputs_are_merged() {
    let graph = Graph::new(
        vec![
            expression_node("left", &[("a", "1")]),
            expression_node("right", &[("b", "'x'"), ("a", "'y'")]),
            output_node("sink"),
        ],
        vec![
            Edge::new("e1", "left", "sink"),
            Edge::new("e2", "right", "sink"),
        ],
    );
    let result = propagate_all(&graph, None);

    assert_eq!(
        result.input("sink").unwrap().to_string(),
        "{ a: number | string; b: string }"
    );
}

#[test]
fn test_two_node_cycle_resolves_to_any() {
    let graph = Graph::new(
        vec![
            expression_node("A", &[("a", "1")]),
            expression_node("B", &[("b", "2")]),
            output_node("C"),
        ],
        vec![
            Edge::new("ab", "A", "B"),
            Edge::new("ba", "B", "A"),
            Edge::new("bc", "B", "C"),
        ],
    );
    let result = propagate_all(&graph, None);

    for id in ["A", "B"] {
        assert_eq!(result.input(id), Some(&TypeShape::Any));
        assert_eq!(result.output(id), Some(&TypeShape::Any));
    }
    assert_eq!(result.input("C"), Some(&TypeShape::Any));
    assert_eq!(
        result.issues,
        vec![GraphIssue::CyclicDependency {
            node_ids: vec!["A".to_string(), "B".to_string()]
        }]
    );
    assert!(result.has_cycle());
    assert_eq!(result.cyclic_nodes(), BTreeSet::from(["A", "B"]));
}

#[test]
fn test_self_loop_is_a_cycle() {
    let graph = Graph::new(
        vec![input_node("request"), expression_node("loop", &[("a", "1")])],
        vec![
            Edge::new("in", "request", "loop"),
            Edge::new("self", "loop", "loop"),
        ],
    );
    let result = propagate_all(&graph, Some(&create_sample_input()));

    assert_eq!(result.output("request"), Some(&create_sample_input()));
    assert_eq!(result.output("loop"), Some(&TypeShape::Any));
    assert_eq!(result.cyclic_nodes(), BTreeSet::from(["loop"]));
}

#[test]
fn test_independent_cycles_are_reported_separately() {
    let graph = Graph::new(
        vec![
            output_node("a1"),
            output_node("a2"),
            output_node("b1"),
            output_node("b2"),
        ],
        vec![
            Edge::new("1", "a1", "a2"),
            Edge::new("2", "a2", "a1"),
            Edge::new("3", "b1", "b2"),
            Edge::new("4", "b2", "b1"),
            Edge::new("5", "a2", "b1"),
        ],
    );
    let result = propagate_all(&graph, None);

    let cycles: Vec<&GraphIssue> = result.issues.iter().filter(|i| i.is_cycle()).collect();
    assert_eq!(cycles.len(), 2);
    assert_eq!(result.nodes.len(), 4);
}

#[test]
fn test_large_cycle_terminates() {
    let ids: Vec<String> = (0..10_000).map(|i| format!("n{}", i)).collect();
    let nodes = ids.iter().map(|id| output_node(id)).collect();
    let mut edges: Vec<Edge> = ids
        .windows(2)
        .map(|pair| Edge::new(&format!("{}-{}", pair[0], pair[1]), &pair[0], &pair[1]))
        .collect();
    edges.push(Edge::new("back", &ids[ids.len() - 1], &ids[0]));

    let result = propagate_all(&Graph::new(nodes, edges), None);
    assert_eq!(result.nodes.len(), 10_000);
    assert_eq!(result.cyclic_nodes().len(), 10_000);
    assert!(result.nodes.values().all(|types| types.output.is_any()));
}

#[test]
fn test_long_chain_terminates() {
    let ids: Vec<String> = (0..10_000).map(|i| format!("n{}", i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let mut nodes = vec![input_node(&ids[0])];
    nodes.extend(ids[1..].iter().map(|id| output_node(id)));

    let input = create_sample_input();
    let result = propagate_all(&Graph::new(nodes, chain(&id_refs)), Some(&input));
    assert_eq!(result.output("n9999"), Some(&input));
    assert!(!result.has_cycle());
}

#[test]
fn test_unknown_kind_and_malformed_content_type_as_any() {
    let graph = Graph::new(
        vec![
            input_node("request"),
            Node::new("plugin", "myPlugin", "plugin", json!({ "anything": true })),
            Node::new("broken", "expressionNode", "broken", json!({ "expressions": 7 })),
            output_node("sink"),
        ],
        vec![
            Edge::new("e1", "request", "plugin"),
            Edge::new("e2", "request", "broken"),
            Edge::new("e3", "plugin", "sink"),
        ],
    );
    let result = propagate_all(&graph, Some(&create_sample_input()));

    assert_eq!(result.output("plugin"), Some(&TypeShape::Any));
    assert_eq!(result.output("broken"), Some(&TypeShape::Any));
    assert_eq!(result.input("sink"), Some(&TypeShape::Any));
    assert!(result.issues.contains(&GraphIssue::UnknownKind {
        node_id: "plugin".to_string(),
        kind: "myPlugin".to_string()
    }));
    assert!(result.issues.iter().any(|issue| matches!(
        issue,
        GraphIssue::MalformedContent { node_id, .. } if node_id == "broken"
    )));
}

#[test]
fn test_invalid_expression_only_affects_its_row() {
    let graph = Graph::new(
        vec![
            input_node("request"),
            expression_node("calc", &[("bad", "price *"), ("good", "price + 1")]),
        ],
        chain(&["request", "calc"]),
    );
    let result = propagate_all(&graph, Some(&create_sample_input()));

    assert_eq!(
        result.output("calc"),
        Some(&TypeShape::object([
            ("bad", TypeShape::Any),
            ("good", TypeShape::number()),
        ]))
    );
    assert_eq!(result.issues.len(), 1);
    assert!(matches!(
        &result.issues[0],
        GraphIssue::InvalidExpression { node_id, expression, .. }
            if node_id == "calc" && expression == "price *"
    ));
}

#[test]
fn test_dangling_edges_are_ignored() {
    let graph = Graph::new(
        vec![expression_node("calc", &[("x", "1")])],
        vec![Edge::new("ghost", "nowhere", "calc")],
    );
    let result = propagate_all(&graph, None);

    assert_eq!(result.input("calc"), Some(&TypeShape::empty_object()));
    assert!(graph.validate().is_err());
}

#[test]
fn test_unchanged_run_reuses_everything() {
    let graph = create_sample_graph();
    let propagator = Propagator::builder()
        .with_external_input(create_sample_input())
        .build();

    let first = propagator.propagate(&graph, &ids(&["request"]), None);
    let second = propagator.propagate(&graph, &BTreeSet::new(), Some(&first));

    assert!(second.recomputed.is_empty());
    assert!(second.dirty.is_empty());
    assert_eq!(second.nodes, first.nodes);
}

#[test]
fn test_changed_node_is_recomputed_and_downstream_reused_when_stable() {
    let graph = create_sample_graph();
    let propagator = Propagator::builder()
        .with_external_input(create_sample_input())
        .build();
    let first = propagator.propagate(&graph, &ids(&["request"]), None);

    // Same output shape: `tiers` sees an unchanged input and is reused.
    let mut edited = graph.clone();
    edited.nodes[1].content = expression_content(&[("total", "price + quantity"), ("label", "name")]);
    let second = propagator.propagate(&edited, &ids(&["totals"]), Some(&first));

    assert_eq!(second.dirty, ids(&["totals", "tiers", "response"]));
    assert_eq!(second.recomputed, ids(&["totals"]));
    assert_eq!(second.nodes, first.nodes);

    // New output shape: `tiers` is recomputed, but its own output is stable.
    let mut edited = graph.clone();
    edited.nodes[1].content = expression_content(&[("total", "name")]);
    let third = propagator.propagate(&edited, &ids(&["totals"]), Some(&first));

    assert_eq!(third.recomputed, ids(&["totals", "tiers"]));
    assert_eq!(
        third.input("tiers"),
        Some(&TypeShape::object([("total", TypeShape::string())]))
    );
}

#[test]
fn test_new_external_input_recomputes_input_nodes() {
    let graph = Graph::new(
        vec![input_node("request"), output_node("response")],
        chain(&["request", "response"]),
    );
    let before = TypeShape::object([("a", TypeShape::number())]);
    let after = TypeShape::object([("b", TypeShape::string())]);

    let first = Propagator::builder()
        .with_external_input(before.clone())
        .build()
        .propagate(&graph, &ids(&["request"]), None);
    let second = Propagator::builder()
        .with_external_input(after.clone())
        .build()
        .propagate(&graph, &BTreeSet::new(), Some(&first));

    assert_eq!(second.output("request"), Some(&after));
    assert_eq!(second.output("response"), Some(&after));
    assert_eq!(second.recomputed, ids(&["request", "response"]));

    let third = Propagator::builder()
        .with_external_input(after.clone())
        .build()
        .propagate(&graph, &BTreeSet::new(), Some(&second));
    assert!(third.recomputed.is_empty());
}

#[test]
fn test_untracked_edits_are_still_detected() {
    let graph = create_sample_graph();
    let propagator = Propagator::default();
    let first = propagator.propagate(&graph, &BTreeSet::new(), None);

    let mut edited = graph.clone();
    edited.nodes[2] = table_node("tiers", "tier", &["1"]);
    let second = propagator.propagate(&edited, &BTreeSet::new(), Some(&first));

    assert!(second.recomputed.contains("tiers"));
    assert_eq!(
        second.output("tiers"),
        Some(&TypeShape::object([("tier", TypeShape::number())]))
    );
}

#[test]
fn test_reused_nodes_keep_their_issues() {
    let graph = Graph::new(vec![expression_node("calc", &[("bad", "nope(")])], vec![]);
    let propagator = Propagator::default();

    let first = propagator.propagate(&graph, &ids(&["calc"]), None);
    let second = propagator.propagate(&graph, &BTreeSet::new(), Some(&first));

    assert!(second.recomputed.is_empty());
    assert_eq!(second.issues, first.issues);
    assert_eq!(second.issues.len(), 1);
}

struct ConstantSpecification;

impl NodeSpecification for ConstantSpecification {
    fn kind(&self) -> &str {
        "constantNode"
    }

    fn compare(&self, _previous: &Node, _current: &Node) -> Result<ContentDiff, ContentError> {
        Ok(ContentDiff::default())
    }

    fn infer_output(
        &self,
        _node: &Node,
        _input: &TypeShape,
        _context: &InferenceContext<'_>,
    ) -> Result<Inference, ContentError> {
        Ok(Inference::new(TypeShape::object([("constant", TypeShape::number())])))
    }

    fn default_content(&self) -> Value {
        json!({})
    }
}

#[test]
fn test_custom_specification() {
    let registry = NodeRegistry::builder()
        .with_specification(Box::new(ConstantSpecification))
        .build();
    assert!(registry.contains("constantNode"));
    assert_eq!(registry.default_content("unknownNode"), Value::Null);
    assert_eq!(registry.default_content("expr"), json!({ "expressions": [] }));

    let graph = Graph::new(
        vec![Node::new("k", "constantNode", "k", Value::Null), output_node("sink")],
        chain(&["k", "sink"]),
    );
    let result = Propagator::builder()
        .with_registry(registry)
        .build()
        .propagate(&graph, &ids(&["k"]), None);

    assert_eq!(result.input("sink").unwrap().get("constant"), TypeShape::number());
    assert!(result.issues.is_empty());
}

#[test]
fn test_result_serializes_without_internal_state() {
    let graph = create_sample_graph();
    let result = propagate_all(&graph, Some(&create_sample_input()));
    let value = serde_json::to_value(&result).unwrap();

    assert!(value.get("states").is_none());
    assert!(value["nodes"]["totals"]["output"].is_object());
    assert_eq!(value["recomputed"].as_array().map(Vec::len), Some(4));
}

#[test]
fn test_issues_serialize_with_their_tag_and_kind() {
    let issues = vec![
        GraphIssue::MalformedContent {
            node_id: "a".into(),
            kind: "expressionNode".into(),
            message: "bad".into(),
        },
        GraphIssue::UnknownKind {
            node_id: "b".into(),
            kind: "myPlugin".into(),
        },
        GraphIssue::CyclicDependency {
            node_ids: vec!["c".into(), "d".into()],
        },
        GraphIssue::InvalidExpression {
            node_id: "e".into(),
            expression: "price >".into(),
            message: "unexpected end".into(),
        },
    ];
    let value = serde_json::to_value(&issues).unwrap();

    assert_eq!(value[0]["issue"], "malformedContent");
    assert_eq!(value[0]["kind"], "expressionNode");
    assert_eq!(value[0]["nodeId"], "a");
    assert_eq!(value[1]["issue"], "unknownKind");
    assert_eq!(value[1]["kind"], "myPlugin");
    assert_eq!(value[2]["issue"], "cyclicDependency");
    assert_eq!(value[2]["nodeIds"], json!(["c", "d"]));
    assert_eq!(value[3]["issue"], "invalidExpression");
    assert_eq!(value[3]["expression"], "price >");
}

#[test]
fn test_result_with_issues_serializes() {
    let graph = Graph::new(
        vec![
            Node::new("x", "myPlugin", "x", json!({})),
            expression_node("calc", &[("bad", "nope(")]),
        ],
        vec![],
    );
    let result = propagate_all(&graph, None);
    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["nodes"]["x"]["issues"][0]["issue"], "unknownKind");
    assert_eq!(value["nodes"]["x"]["issues"][0]["kind"], "myPlugin");
    assert_eq!(value["issues"].as_array().map(Vec::len), Some(2));
}
