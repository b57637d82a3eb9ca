//! DOT export of the provider → dependent structure.
//!
//! Materializes the relations the reverse indexes only answer queries
//! about, so the invalidation topology can be inspected with Graphviz.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::graph::{DepGraph, Fact};

/// Render the graph as Graphviz DOT.
///
/// One edge per (provider, dependent, fact) triple, labeled with the fact.
/// Marked nodes carry a ` *` suffix. Nodes and facts are emitted in sorted
/// order, so output is stable for a given load sequence.
pub fn to_dot<N>(graph: &DepGraph<N>) -> String
where
    N: Clone + Eq + Hash + fmt::Debug + fmt::Display,
{
    let mut labels: Vec<(String, N)> = graph.nodes().map(|n| (n.to_string(), n.clone())).collect();
    labels.sort_by(|a, b| a.0.cmp(&b.0));

    let mut dg: DiGraph<String, String> = DiGraph::new();
    let mut index: HashMap<String, NodeIndex> = HashMap::new();
    for (label, node) in &labels {
        let display = if graph.is_marked(node) {
            format!("{label} *")
        } else {
            label.clone()
        };
        index.insert(label.clone(), dg.add_node(display));
    }

    for (label, node) in &labels {
        let from = index[label];
        if let Some(provides) = graph.provides_of(node) {
            let mut facts: Vec<&Fact> = provides.iter().collect();
            facts.sort_by_key(|f| f.to_string());
            for fact in facts {
                let fact_label = fact.to_string();
                for dependent in graph.dependents_of_fact(fact) {
                    let to = index[&dependent.to_string()];
                    dg.add_edge(from, to, fact_label.clone());
                }
            }
        }
    }

    Dot::new(&dg).to_string()
}
