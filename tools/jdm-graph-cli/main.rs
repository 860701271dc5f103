use clap::{Parser, Subcommand};
use jdm_graph::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use tracing_subscriber::EnvFilter;

/// Diff and type-check JSON Decision Model graphs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare two snapshots of a graph and print the annotated graph
    Diff {
        /// Path to the previous graph JSON file
        previous_path: String,
        /// Path to the current graph JSON file
        current_path: String,

        /// Flag nodes that moved further than this many pixels on the canvas
        #[arg(long)]
        position_threshold: Option<f64>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Propagate types through a graph and print each node's shapes
    Types {
        /// Path to the graph JSON file
        graph_path: String,

        /// Optional sample input data; its shape is fed to input nodes
        #[arg(long)]
        sample: Option<String>,

        /// Only print the shapes of this node
        #[arg(long)]
        node: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Diff {
            previous_path,
            current_path,
            position_threshold,
            pretty,
        } => run_diff(&previous_path, &current_path, position_threshold, pretty),
        Command::Types {
            graph_path,
            sample,
            node,
        } => run_types(&graph_path, sample.as_deref(), node.as_deref()),
    }
}

fn run_diff(previous_path: &str, current_path: &str, position_threshold: Option<f64>, pretty: bool) {
    let previous = load_graph(previous_path);
    let current = load_graph(current_path);

    let mut builder = Differ::builder();
    if let Some(threshold) = position_threshold {
        builder = builder.with_position_threshold(threshold);
    }
    let annotated = builder.build().diff(&previous, &current);

    let rendered = if pretty {
        serde_json::to_string_pretty(&annotated)
    } else {
        serde_json::to_string(&annotated)
    }
    .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize diff: {}", e)));
    println!("{}", rendered);

    let summary = annotated.summary();
    eprintln!(
        "\n--- Diff Summary ---\nAdded: {}  Removed: {}  Modified: {}  Moved: {}  Unchanged: {}",
        summary.added, summary.removed, summary.modified, summary.moved, summary.unchanged
    );
    for issue in &annotated.issues {
        eprintln!("  -> {}", issue);
    }
}

fn run_types(graph_path: &str, sample_path: Option<&str>, node_id: Option<&str>) {
    let graph = load_graph(graph_path);

    let external_input = sample_path.map(|path| {
        let json = fs::read_to_string(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to read sample file '{}': {}", path, e)));
        let sample: serde_json::Value = serde_json::from_str(&json)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse sample JSON: {}", e)));
        TypeShape::from_sample(&sample)
    });

    let changed: BTreeSet<String> = graph.nodes.iter().map(|n| n.id.clone()).collect();
    let result = propagate_types(&graph, external_input.as_ref(), &changed);

    for node in &graph.nodes {
        if node_id.is_some_and(|id| id != node.id) {
            continue;
        }
        let Some(types) = result.node(&node.id) else {
            continue;
        };
        println!("{} ({}, {})", node.id, node.kind, node.name);
        println!("  input:  {}", types.input);
        println!("  output: {}", types.output);
    }

    if let Some(id) = node_id {
        if result.node(id).is_none() {
            exit_with_error(&format!("Node '{}' is not part of the graph", id));
        }
    }
    for issue in &result.issues {
        eprintln!("  -> {}", issue);
    }
}

fn load_graph(path: &str) -> Graph {
    let json = fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read graph file '{}': {}", path, e)));
    let graph = Graph::from_json(&json).unwrap_or_else(|e| exit_with_error(&e.to_string()));
    if let Err(e) = graph.validate() {
        tracing::warn!(path, error = %e, "graph is not valid, continuing anyway");
    }
    graph
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
