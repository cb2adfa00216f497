use color_eyre::eyre::{Report, Result};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::prelude::StableGraph;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use tracing::info;

use crate::loader::LoadError;
use crate::pda::Pda;
use crate::symbol::Symbol;

/// Label of one transition, `a, A → BA`, with the push string shown top first
fn transition_label(trigger: &str, top: &Symbol, push: &[Symbol]) -> String {
    let push = if push.is_empty() {
        "ε".to_string()
    } else {
        push.iter().rev().map(Symbol::as_str).collect::<String>()
    };
    format!("{}, {} → {}", trigger, top, push)
}

fn generate_stable_graph(pda: &Pda) -> StableGraph<String, String> {
    let mut stable_graph = StableGraph::new();

    let mut edge_map: HashMap<(NodeIndex, NodeIndex), EdgeIndex> = HashMap::new();

    for state in 0..pda.num_states() {
        let name = pda.state_name(state);
        let mut label = name.to_string();
        if state == pda.start_state() {
            label = format!("Start\n{}", label);
        }
        if pda.is_accept_state(state) {
            label = format!("{}\nAccept", label);
        }
        stable_graph.add_node(label);
    }

    // Several transitions between the same pair of states share one edge
    for (from, trigger, top, target) in pda.transitions().iter() {
        let source = NodeIndex::new(from);
        let destination = NodeIndex::new(target.next_state);
        let label = transition_label(&trigger.to_string(), top, &target.push);

        match edge_map.get(&(source, destination)) {
            Some(edge_idx) => {
                let old_label = &stable_graph[*edge_idx];
                let new_label = format!("{}\n{}", old_label, label);
                stable_graph[*edge_idx] = new_label;
            }
            None => {
                let edge_idx = stable_graph.add_edge(source, destination, label);
                edge_map.insert((source, destination), edge_idx);
            }
        }
    }

    stable_graph
}

/// The state diagram in Graphviz dot syntax
pub fn to_dot(pda: &Pda) -> String {
    let stable_graph = generate_stable_graph(pda);
    let dot = Dot::with_config(&stable_graph, &[Config::GraphContentOnly]);
    format!("digraph {{\n    rankdir=LR;\n{}}}\n", dot)
}

/// Write the state diagram to `<filename>.dot`
pub fn save_dot(pda: &Pda, filename: &str) -> Result<()> {
    let dot_filename = format!("{}.dot", filename);
    let mut dot_file = File::create(&dot_filename).map_err(|err| {
        Report::new(LoadError::FileOpenError(format!(
            "Error: Failed to create dot file {}: {}",
            dot_filename, err
        )))
    })?;

    dot_file
        .write_all(to_dot(pda).as_bytes())
        .map_err(|err| Report::new(LoadError::FileReadError(err.to_string())))?;

    info!("PDA state diagram saved as {}", dot_filename);
    Ok(())
}
