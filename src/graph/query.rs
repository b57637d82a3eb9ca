//
//  query.rs
//  Cascade
//
//  Created by hak (tharun)
//
//  Read-only queries over the dependency graph.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::hash::Hash;

use super::engine::DepGraph;
use super::types::*;

impl<N> DepGraph<N>
where
    N: Clone + Eq + Hash + fmt::Debug,
{
    /// Current mark state. Unknown nodes are unmarked.
    pub fn is_marked(&self, node: &N) -> bool {
        self.records.get(node).is_some_and(|r| r.marked)
    }

    /// Every external path ever recorded by any load, independent of later
    /// reloads and of mark state. This is what a driver watches.
    pub fn external_dependencies(&self) -> &BTreeSet<String> {
        &self.external_paths
    }

    /// The facts the node currently provides, if it has a record.
    pub fn provides_of(&self, node: &N) -> Option<&HashSet<Fact>> {
        self.records.get(node).map(|r| &r.provides)
    }

    /// The facts the node currently depends on, if it has a record.
    pub fn depends_of(&self, node: &N) -> Option<&HashSet<Fact>> {
        self.records.get(node).map(|r| &r.depends)
    }

    /// Iterate every node with a record, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.records.keys()
    }

    /// Summary counts over the whole graph.
    pub fn stats(&self) -> GraphStats {
        let mut provided: HashSet<&Fact> = HashSet::new();
        let mut depended: HashSet<&Fact> = HashSet::new();
        let mut marked = 0;
        for record in self.records.values() {
            if record.marked {
                marked += 1;
            }
            provided.extend(record.provides.iter());
            depended.extend(record.depends.iter());
        }
        GraphStats {
            nodes: self.records.len(),
            marked,
            provided_facts: provided.len(),
            depended_facts: depended.len(),
            external_paths: self.external_paths.len(),
        }
    }
}
