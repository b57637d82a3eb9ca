//
//  engine.rs
//  Cascade
//
//  Created by hak (tharun)
//

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hash;

use super::types::*;

/// The coarse-grained dependency graph — one record per compilation unit,
/// with reverse indexes for fast "who depends on this fact" lookup.
///
/// `N` is the caller's node identifier: any cheap, hashable key (an integer
/// handle, an interned string, a unit name). The graph never invents nodes;
/// it accumulates records for the identifiers the driver presents.
#[derive(Clone)]
pub struct DepGraph<N> {
    /// Per-node records: provides, depends, and the mark bit.
    pub(crate) records: HashMap<N, NodeRecord>,
    /// Index: fact -> nodes whose `depends` contains it, for the
    /// exact-match kinds (top-level, nominal, dynamic-lookup, external).
    /// Buckets keep first-seen insertion order and hold each node once.
    pub(crate) dependents: HashMap<Fact, Vec<N>>,
    /// Index: type name -> member dependents of that type, kept separately
    /// because member matching is partial (`None` is the any-member
    /// wildcard on either side).
    pub(crate) member_dependents: HashMap<String, Vec<(Option<String>, N)>>,
    /// Every external path ever recorded by any load. Append-only: reloads
    /// that drop an external dependency do not remove it here.
    pub(crate) external_paths: BTreeSet<String>,
}

impl<N> DepGraph<N>
where
    N: Clone + Eq + Hash + fmt::Debug,
{
    /// Create a new empty dependency graph.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            dependents: HashMap::new(),
            member_dependents: HashMap::new(),
            external_paths: BTreeSet::new(),
        }
    }

    /// Number of nodes with a record.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the node has a record (from a load or an implicit mark).
    pub fn contains(&self, node: &N) -> bool {
        self.records.contains_key(node)
    }

    /// Every node whose `depends` set matches the given provided fact.
    ///
    /// For member facts the match is partial: a provider `(T, m)` reaches
    /// dependents on `(T, m)` and on the wildcard `(T, "")`, and a wildcard
    /// provider `(T, "")` reaches every member dependent of `T`. The result
    /// holds each node once, in first-seen dependency order.
    pub fn dependents_of_fact(&self, provided: &Fact) -> Vec<N> {
        match provided {
            Fact::Member { type_name, member } => {
                let mut out: Vec<N> = Vec::new();
                if let Some(bucket) = self.member_dependents.get(type_name) {
                    for (dep_member, node) in bucket {
                        if member_matches(member, dep_member) && !out.contains(node) {
                            out.push(node.clone());
                        }
                    }
                }
                out
            }
            exact => self.dependents.get(exact).cloned().unwrap_or_default(),
        }
    }

    // ─── Internal Helpers ───────────────────────────────────────

    /// Fetch the node's record, creating an empty one if absent.
    pub(crate) fn record_entry(&mut self, node: N) -> &mut NodeRecord {
        self.records.entry(node).or_default()
    }

    /// Add `node` to the reverse index bucket for a dependency fact.
    pub(crate) fn index_dependent(&mut self, fact: &Fact, node: &N) {
        match fact {
            Fact::Member { type_name, member } => {
                let bucket = self.member_dependents.entry(type_name.clone()).or_default();
                if !bucket.iter().any(|(m, n)| m == member && n == node) {
                    bucket.push((member.clone(), node.clone()));
                }
            }
            exact => {
                let bucket = self.dependents.entry(exact.clone()).or_default();
                if !bucket.contains(node) {
                    bucket.push(node.clone());
                }
            }
        }
    }

    /// Drop `node` from the reverse index bucket for a dependency fact.
    pub(crate) fn unindex_dependent(&mut self, fact: &Fact, node: &N) {
        match fact {
            Fact::Member { type_name, member } => {
                if let Some(bucket) = self.member_dependents.get_mut(type_name) {
                    bucket.retain(|(m, n)| !(m == member && n == node));
                    if bucket.is_empty() {
                        self.member_dependents.remove(type_name);
                    }
                }
            }
            exact => {
                if let Some(bucket) = self.dependents.get_mut(exact) {
                    bucket.retain(|n| n != node);
                    if bucket.is_empty() {
                        self.dependents.remove(exact);
                    }
                }
            }
        }
    }
}

/// A dependency on `dep` is satisfied by a provider of `provided` when
/// either side is the any-member wildcard or the names agree.
fn member_matches(provided: &Option<String>, dep: &Option<String>) -> bool {
    provided.is_none() || dep.is_none() || provided == dep
}

impl<N> Default for DepGraph<N>
where
    N: Clone + Eq + Hash + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N> fmt::Debug for DepGraph<N>
where
    N: Clone + Eq + Hash + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepGraph")
            .field("nodes", &self.records.len())
            .field("fact_buckets", &self.dependents.len())
            .field("member_types", &self.member_dependents.len())
            .field("external_paths", &self.external_paths.len())
            .finish()
    }
}
