//
//  mutation.rs
//  Cascade
//
//  Created by hak (tharun)
//
//  Loading fact summaries into the graph and propagating "needs rebuild"
//  marks. Everything here takes &mut self; queries live in query.rs.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;

use tracing::debug;

use super::engine::DepGraph;
use super::types::*;
use crate::parser::{FactSummary, ParseError};

impl<N> DepGraph<N>
where
    N: Clone + Eq + Hash + fmt::Debug,
{
    /// Load (or reload) a node's fact summary from its textual form.
    ///
    /// Parsing is all-or-nothing: on a parse error the node's prior record
    /// and the reverse indexes are left exactly as they were.
    pub fn load_from_str(&mut self, node: N, text: &str) -> Result<LoadResult, ParseError> {
        let summary = FactSummary::parse(text)?;
        Ok(self.load_summary(node, &summary))
    }

    /// Load (or reload) a node's already-parsed fact summary.
    ///
    /// Replaces the node's entire record: stale reverse-index entries from
    /// the previous load are pruned, new ones added, and any external paths
    /// are appended to the graph's global external set. The returned
    /// [`LoadResult`] reports whether the provides set changed relative to
    /// the prior record; marks are never inspected or modified here.
    pub fn load_summary(&mut self, node: N, summary: &FactSummary) -> LoadResult {
        let new_provides: HashSet<Fact> = summary.provides_facts().into_iter().collect();
        let new_depends: HashSet<Fact> = summary.depends_facts().into_iter().collect();

        let result = match self.records.get(&node) {
            None => LoadResult::UpToDate,
            Some(record) if record.provides == new_provides => LoadResult::UpToDate,
            Some(_) => LoadResult::AffectsDownstream,
        };

        let stale: Vec<Fact> = match self.records.get(&node) {
            Some(record) => record.depends.difference(&new_depends).cloned().collect(),
            None => Vec::new(),
        };
        for fact in &stale {
            self.unindex_dependent(fact, &node);
        }
        for fact in &new_depends {
            self.index_dependent(fact, &node);
            if let Fact::External(path) = fact {
                self.external_paths.insert(path.clone());
            }
        }

        debug!(
            node = ?node,
            result = ?result,
            provides = new_provides.len(),
            depends = new_depends.len(),
            "fact summary loaded"
        );

        let record = self.record_entry(node);
        record.provides = new_provides;
        record.depends = new_depends;
        result
    }

    // ─── Marking ────────────────────────────────────────────────

    /// Mark `root` and everything transitively depending on what it
    /// provides. Returns the nodes that newly became marked, root excluded,
    /// in traversal order.
    ///
    /// The root is traversed even when it is already marked — a reload may
    /// have changed its provides since the last call. Nodes *reached*
    /// during traversal that are already marked are skipped entirely: not
    /// re-expanded and not reported. That check is what terminates cycles.
    pub fn mark_transitive(&mut self, root: N) -> Vec<N> {
        let mut newly: Vec<N> = Vec::new();
        let mut queue: VecDeque<N> = VecDeque::new();

        self.record_entry(root.clone()).marked = true;
        queue.push_back(root.clone());

        while let Some(current) = queue.pop_front() {
            let provides: Vec<Fact> = match self.records.get(&current) {
                Some(record) => record.provides.iter().cloned().collect(),
                None => continue,
            };
            for fact in provides {
                for dependent in self.dependents_of_fact(&fact) {
                    let record = self.record_entry(dependent.clone());
                    if record.marked {
                        continue;
                    }
                    record.marked = true;
                    newly.push(dependent.clone());
                    queue.push_back(dependent);
                }
            }
        }

        debug!(root = ?root, newly = newly.len(), "transitive mark");
        newly
    }

    /// Mark exactly this node, no propagation. Returns true iff the node
    /// was previously unmarked.
    pub fn mark_intransitive(&mut self, node: N) -> bool {
        let record = self.record_entry(node);
        if record.marked {
            return false;
        }
        record.marked = true;
        true
    }

    /// Mark every node directly depending on the external path, each as a
    /// transitive root. Returns the union of newly marked nodes — roots
    /// included — deduplicated.
    ///
    /// The marked check per root is lazy: a root already marked (before
    /// the call, or by an earlier root's propagation within it) is skipped
    /// entirely and does not propagate.
    pub fn mark_external(&mut self, path: &str) -> Vec<N> {
        let roots: Vec<N> = self
            .dependents
            .get(&Fact::External(path.to_string()))
            .cloned()
            .unwrap_or_default();

        let mut newly: Vec<N> = Vec::new();
        for root in roots {
            if self.is_marked(&root) {
                continue;
            }
            newly.push(root.clone());
            newly.extend(self.mark_transitive(root));
        }

        debug!(path, newly = newly.len(), "external mark");
        newly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(graph: &mut DepGraph<u32>, node: u32, text: &str) -> LoadResult {
        graph.load_from_str(node, text).unwrap()
    }

    fn sorted(mut nodes: Vec<u32>) -> Vec<u32> {
        nodes.sort_unstable();
        nodes
    }

    #[test]
    fn test_load_records_all_kinds() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(
            &mut graph,
            0,
            "\
provides-top-level: [a]
provides-nominal: [N]
provides-dynamic-lookup: [d]
provides-member: [[m, mm], [n, nn]]
depends-top-level: [b]
depends-nominal: [M]
depends-dynamic-lookup: [e]
depends-member: [[a, \"\"]]
depends-external: [/foo, /bar]
",
        );
        let provides = graph.provides_of(&0).unwrap();
        assert_eq!(provides.len(), 5);
        assert!(provides.contains(&Fact::TopLevel("a".into())));
        assert!(provides.contains(&Fact::member("n", "nn")));

        let depends = graph.depends_of(&0).unwrap();
        assert_eq!(depends.len(), 6);
        assert!(depends.contains(&Fact::member("a", "")));
        assert!(depends.contains(&Fact::External("/bar".into())));

        let externals: Vec<&String> = graph.external_dependencies().iter().collect();
        assert_eq!(externals, ["/bar", "/foo"]);
        assert!(!graph.is_marked(&0));
    }

    #[test]
    fn test_independent_nodes() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a]");
        load(&mut graph, 1, "provides-top-level: [b]");
        assert!(graph.mark_transitive(0).is_empty());
        assert!(graph.is_marked(&0));
        assert!(!graph.is_marked(&1));
    }

    #[test]
    fn test_same_name_different_kind_is_independent() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-nominal: [b]\ndepends-nominal: [a]");
        load(&mut graph, 1, "provides-top-level: [a]\ndepends-top-level: [b]");
        assert!(graph.mark_transitive(0).is_empty());
        assert!(graph.mark_transitive(1).is_empty());
        assert!(graph.is_marked(&0));
        assert!(graph.is_marked(&1));
    }

    #[test]
    fn test_simple_dependent() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a, b, c]");
        load(&mut graph, 1, "depends-top-level: [x, b, z]");
        assert_eq!(graph.mark_transitive(0), vec![1]);
        assert!(graph.is_marked(&0));
        assert!(graph.is_marked(&1));
        // Converged: a second call reports nothing new.
        assert!(graph.mark_transitive(0).is_empty());
    }

    #[test]
    fn test_simple_dependent_reverse() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "depends-top-level: [a, b, c]");
        load(&mut graph, 1, "provides-top-level: [x, b, z]");
        assert_eq!(graph.mark_transitive(1), vec![0]);
        assert!(graph.mark_transitive(0).is_empty());
        assert!(graph.is_marked(&0));
        assert!(graph.is_marked(&1));
    }

    #[test]
    fn test_nominal_dependent() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-nominal: [a, b]");
        load(&mut graph, 1, "depends-nominal: [b]");
        assert_eq!(graph.mark_transitive(0), vec![1]);
    }

    #[test]
    fn test_dynamic_lookup_dependent() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-dynamic-lookup: [a, b, c]");
        load(&mut graph, 1, "depends-dynamic-lookup: [x, b, z]");
        assert_eq!(graph.mark_transitive(0), vec![1]);
    }

    #[test]
    fn test_provider_of_several_kinds() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a]\nprovides-nominal: [a]");
        load(&mut graph, 1, "depends-nominal: [a]");
        assert_eq!(graph.mark_transitive(0), vec![1]);
    }

    #[test]
    fn test_member_exact_match() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-member: [[b, bb]]");
        load(&mut graph, 1, "depends-member: [[b, bb]]");
        load(&mut graph, 2, "depends-member: [[b, cc]]");
        assert_eq!(graph.mark_transitive(0), vec![1]);
        assert!(!graph.is_marked(&2));
    }

    #[test]
    fn test_member_wildcard_dependent_matches_specific_provider() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-member: [[a, aa]]");
        load(&mut graph, 1, "depends-member: [[a, \"\"]]");
        assert_eq!(graph.mark_transitive(0), vec![1]);
    }

    #[test]
    fn test_member_wildcard_provider_matches_specific_dependent() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-member: [[z, \"\"]]");
        load(&mut graph, 1, "depends-member: [[z, zz]]");
        assert_eq!(graph.mark_transitive(0), vec![1]);
    }

    #[test]
    fn test_multiple_dependents_same_fact() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a]");
        load(&mut graph, 1, "depends-top-level: [a]");
        load(&mut graph, 2, "depends-top-level: [a]");
        assert_eq!(sorted(graph.mark_transitive(0)), vec![1, 2]);
    }

    #[test]
    fn test_multiple_dependents_different_facts() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a, b]");
        load(&mut graph, 1, "depends-top-level: [a]");
        load(&mut graph, 2, "depends-top-level: [b]");
        assert_eq!(sorted(graph.mark_transitive(0)), vec![1, 2]);
    }

    #[test]
    fn test_chained_dependents() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a]");
        load(&mut graph, 1, "depends-top-level: [a]\nprovides-top-level: [b]");
        load(&mut graph, 2, "depends-top-level: [b]");
        assert_eq!(graph.mark_transitive(0), vec![1, 2]);
        assert!(graph.mark_transitive(0).is_empty());
    }

    #[test]
    fn test_already_marked_nodes_not_reported_again() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a]");
        load(&mut graph, 1, "depends-top-level: [a]\nprovides-top-level: [b]");
        load(&mut graph, 2, "depends-top-level: [b, z]");
        load(&mut graph, 10, "provides-top-level: [y]");
        load(&mut graph, 11, "depends-top-level: [y]\nprovides-top-level: [z]");

        assert_eq!(sorted(graph.mark_transitive(0)), vec![1, 2]);
        // Node 2 is reachable again through 11's `z`, but it is already
        // marked, so only 11 is new.
        assert_eq!(graph.mark_transitive(10), vec![11]);
    }

    #[test]
    fn test_reload_changes_provides() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a]");
        load(&mut graph, 1, "depends-top-level: [a]");
        load(&mut graph, 2, "depends-top-level: [b]");

        assert_eq!(graph.mark_transitive(0), vec![1]);

        let result = load(&mut graph, 0, "provides-top-level: [b]");
        assert_eq!(result, LoadResult::AffectsDownstream);

        // The root is already marked, but its new provides still propagate.
        assert_eq!(graph.mark_transitive(0), vec![2]);
        // Node 1 keeps its mark despite losing its justification.
        assert!(graph.is_marked(&1));
    }

    #[test]
    fn test_reload_grows_provides() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a]");
        load(&mut graph, 1, "depends-top-level: [a]");
        load(&mut graph, 2, "depends-top-level: [b]");

        assert_eq!(graph.mark_transitive(0), vec![1]);
        assert_eq!(
            load(&mut graph, 0, "provides-top-level: [a, b]"),
            LoadResult::AffectsDownstream
        );
        assert_eq!(graph.mark_transitive(0), vec![2]);
    }

    #[test]
    fn test_marked_node_does_not_expand_when_reached() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a]");
        load(&mut graph, 1, "depends-top-level: [a]\nprovides-top-level: [b]");
        load(&mut graph, 2, "depends-top-level: [b]");

        assert!(graph.mark_intransitive(1));
        // 1 is already marked when reached from 0: skipped, not expanded.
        assert!(graph.mark_transitive(0).is_empty());
        assert!(!graph.is_marked(&2));

        // As an explicit root, 1 does expand.
        assert_eq!(graph.mark_transitive(1), vec![2]);
    }

    #[test]
    fn test_mark_intransitive_then_transitive_root() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a]");
        load(&mut graph, 1, "depends-top-level: [a]");

        assert!(graph.mark_intransitive(0));
        assert!(!graph.mark_intransitive(0));
        // Pre-marking the root does not stop it expanding.
        assert_eq!(graph.mark_transitive(0), vec![1]);
    }

    #[test]
    fn test_self_dependency_terminates() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a]\ndepends-top-level: [a]");
        assert!(graph.mark_transitive(0).is_empty());
        assert!(graph.is_marked(&0));
    }

    #[test]
    fn test_cycle_terminates_marking_all_once() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a]\ndepends-top-level: [c]");
        load(&mut graph, 1, "provides-top-level: [b]\ndepends-top-level: [a]");
        load(&mut graph, 2, "provides-top-level: [c]\ndepends-top-level: [b]");

        let newly = graph.mark_transitive(0);
        assert_eq!(sorted(newly), vec![1, 2]);
        for node in 0..3 {
            assert!(graph.is_marked(&node));
        }
        assert!(graph.mark_transitive(0).is_empty());
    }

    #[test]
    fn test_mark_unknown_node_creates_record() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        assert!(graph.mark_transitive(99).is_empty());
        assert!(graph.is_marked(&99));
        assert!(graph.contains(&99));

        assert!(graph.mark_intransitive(100));
        assert!(!graph.mark_intransitive(100));
    }

    #[test]
    fn test_is_marked_unknown_node_is_false() {
        let graph: DepGraph<u32> = DepGraph::new();
        assert!(!graph.is_marked(&5));
    }

    #[test]
    fn test_load_result_first_load_up_to_date() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        assert_eq!(
            load(&mut graph, 0, "provides-top-level: [a, b]"),
            LoadResult::UpToDate
        );
    }

    #[test]
    fn test_load_result_set_equal_any_order() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a, b]\nprovides-nominal: [N]");
        assert_eq!(
            load(&mut graph, 0, "provides-nominal: [N]\nprovides-top-level: [b, a]"),
            LoadResult::UpToDate
        );
    }

    #[test]
    fn test_load_result_detects_additions_and_removals() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a]");
        assert_eq!(
            load(&mut graph, 0, "provides-top-level: [a, b]"),
            LoadResult::AffectsDownstream
        );
        assert_eq!(
            load(&mut graph, 0, "provides-top-level: [a]"),
            LoadResult::AffectsDownstream
        );
        assert_eq!(
            load(&mut graph, 0, "provides-top-level: [a]"),
            LoadResult::UpToDate
        );
    }

    #[test]
    fn test_load_result_ignores_depends_changes() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a]\ndepends-top-level: [x]");
        assert_eq!(
            load(&mut graph, 0, "provides-top-level: [a]\ndepends-top-level: [y]"),
            LoadResult::UpToDate
        );
    }

    #[test]
    fn test_load_after_mark_counts_as_prior_record() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        assert!(graph.mark_intransitive(0));
        assert_eq!(
            load(&mut graph, 0, "provides-top-level: [a]"),
            LoadResult::AffectsDownstream
        );
        assert!(graph.is_marked(&0));
    }

    #[test]
    fn test_load_never_touches_marks() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a]");
        load(&mut graph, 1, "depends-top-level: [a]");
        assert_eq!(graph.mark_transitive(0), vec![1]);

        load(&mut graph, 1, "depends-top-level: [a]\nprovides-top-level: [q]");
        assert!(graph.is_marked(&1));
        load(&mut graph, 0, "provides-top-level: [z]");
        assert!(graph.is_marked(&0));
    }

    #[test]
    fn test_load_replaces_depends() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "depends-top-level: [a]");
        assert_eq!(
            load(&mut graph, 0, "depends-top-level: [b]"),
            LoadResult::UpToDate
        );

        load(&mut graph, 1, "provides-top-level: [a]");
        assert!(graph.mark_transitive(1).is_empty());
        assert!(!graph.is_marked(&0));

        load(&mut graph, 2, "provides-top-level: [b]");
        assert_eq!(graph.mark_transitive(2), vec![0]);
    }

    #[test]
    fn test_parse_error_leaves_record_untouched() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a]\ndepends-top-level: [x]");

        assert!(graph.load_from_str(0, "provides-top-level: [a").is_err());
        assert!(graph.load_from_str(0, "provides-garbage: [q]").is_err());

        let provides = graph.provides_of(&0).unwrap();
        assert_eq!(provides.len(), 1);
        assert!(provides.contains(&Fact::TopLevel("a".into())));
        assert!(graph.depends_of(&0).unwrap().contains(&Fact::TopLevel("x".into())));

        // The graph keeps working after the rejected loads.
        load(&mut graph, 1, "depends-top-level: [a]");
        assert_eq!(graph.mark_transitive(0), vec![1]);
    }

    // ─── External Dependencies ──────────────────────────────────

    #[test]
    fn test_simple_external() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "depends-external: [/foo, /bar]");

        let externals: Vec<&String> = graph.external_dependencies().iter().collect();
        assert_eq!(externals, ["/bar", "/foo"]);

        assert_eq!(graph.mark_external("/foo"), vec![0]);
        assert!(graph.is_marked(&0));
        assert!(graph.mark_external("/foo").is_empty());
        assert!(graph.mark_external("/bar").is_empty());
    }

    #[test]
    fn test_external_unknown_path() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "depends-external: [/foo]");
        assert!(graph.mark_external("/nope").is_empty());
        assert!(!graph.is_marked(&0));
    }

    #[test]
    fn test_external_fan_out() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "depends-external: [/foo]");
        load(&mut graph, 1, "depends-external: [/foo]");
        assert_eq!(sorted(graph.mark_external("/foo")), vec![0, 1]);
        assert!(graph.mark_external("/foo").is_empty());
    }

    #[test]
    fn test_chained_external() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a]\ndepends-external: [/foo]");
        load(&mut graph, 1, "depends-top-level: [a]\ndepends-external: [/bar]");

        assert_eq!(sorted(graph.mark_external("/foo")), vec![0, 1]);
        assert!(graph.mark_external("/foo").is_empty());
        assert!(graph.mark_external("/bar").is_empty());
    }

    #[test]
    fn test_chained_external_reverse() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "depends-top-level: [a]\ndepends-external: [/foo]");
        load(&mut graph, 1, "provides-top-level: [a]\ndepends-external: [/bar]");

        assert_eq!(graph.mark_external("/foo"), vec![0]);
        // 0 is already marked: only the new root is reported.
        assert_eq!(graph.mark_external("/bar"), vec![1]);
    }

    #[test]
    fn test_chained_external_pre_marked_root_does_not_propagate() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "provides-top-level: [a]\ndepends-external: [/foo]");
        load(&mut graph, 1, "depends-top-level: [a]");

        assert!(graph.mark_intransitive(0));
        assert!(graph.mark_external("/foo").is_empty());
        assert!(!graph.is_marked(&1));
    }

    #[test]
    fn test_external_set_is_append_only() {
        let mut graph: DepGraph<u32> = DepGraph::new();
        load(&mut graph, 0, "depends-external: [/foo]");
        load(&mut graph, 0, "");

        // Still reported as ever-recorded...
        assert!(graph.external_dependencies().contains("/foo"));
        // ...but no longer anyone's current dependency.
        assert!(graph.mark_external("/foo").is_empty());
        assert!(!graph.is_marked(&0));
    }
}
