//! Fixed-point rebuild driver.
//!
//! Runs the schedule-rebuild-reload-remark loop a build driver wraps around
//! the dependency graph. Start from a graph already loaded with the previous
//! build's fact summaries, seed it with the units whose sources changed, and
//! supply a callback that recompiles one unit and returns its fresh summary
//! text. The loop rebuilds each invalidated unit at most once and stops when
//! no rebuild changes a provides set — the fixed point.
//!
//! ```
//! use cascade::{drive, DepGraph};
//!
//! # fn main() -> cascade::Result<()> {
//! let mut graph: DepGraph<u32> = DepGraph::new();
//! graph.load_from_str(0, "provides-top-level: [a]")?;
//! graph.load_from_str(1, "depends-top-level: [a]")?;
//!
//! // Unit 0's source changed; its recompile now also provides `b`.
//! let plan = drive(&mut graph, vec![0], |unit| {
//!     Ok(match unit {
//!         0 => "provides-top-level: [a, b]".to_string(),
//!         _ => "depends-top-level: [a]".to_string(),
//!     })
//! })?;
//!
//! assert_eq!(plan.rebuilt, vec![0, 1]);
//! # Ok(())
//! # }
//! ```

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{CascadeError, Result};
use crate::graph::{DepGraph, LoadResult};

/// The rebuild schedule a drive actually executed.
#[derive(Debug, Clone, Serialize)]
pub struct Plan<N> {
    /// Every unit rebuilt, in execution order. Each appears at most once.
    pub rebuilt: Vec<N>,
    /// How many rebuilds changed their provides set and cascaded.
    pub cascades: usize,
}

impl<N: Serialize> Plan<N> {
    /// Pretty JSON for logs and tooling.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Rebuild `roots` and everything their fresh summaries invalidate, to a
/// fixed point.
///
/// `rebuild` recompiles one unit and returns its new fact summary text.
/// Every returned summary is reloaded into the graph; a reload that
/// affects downstream marks its dependents, and newly marked units join
/// the queue. Marks are monotone, so the loop terminates with each unit
/// rebuilt at most once.
///
/// A rebuild failure or a malformed summary aborts the drive with the
/// offending unit attached; the graph keeps the state reached so far (a
/// failed reload never half-applies). Callers wanting the conservative
/// fallback can rebuild everything on error.
pub fn drive<N, F>(graph: &mut DepGraph<N>, roots: Vec<N>, mut rebuild: F) -> Result<Plan<N>>
where
    N: Clone + Eq + Hash + fmt::Debug,
    F: FnMut(&N) -> Result<String>,
{
    let mut queue: VecDeque<N> = VecDeque::new();
    let mut scheduled: HashSet<N> = HashSet::new();
    for root in roots {
        graph.mark_intransitive(root.clone());
        if scheduled.insert(root.clone()) {
            queue.push_back(root);
        }
    }
    info!(seeds = queue.len(), "drive started");

    let mut plan = Plan {
        rebuilt: Vec::new(),
        cascades: 0,
    };
    while let Some(unit) = queue.pop_front() {
        let text = rebuild(&unit).map_err(|e| CascadeError::Rebuild {
            node: format!("{unit:?}"),
            message: e.to_string(),
        })?;
        let result = match graph.load_from_str(unit.clone(), &text) {
            Ok(result) => result,
            Err(source) => {
                return Err(CascadeError::BadSummary {
                    node: format!("{unit:?}"),
                    source,
                })
            }
        };
        plan.rebuilt.push(unit.clone());
        debug!(unit = ?unit, result = ?result, "unit rebuilt");

        if result == LoadResult::AffectsDownstream {
            plan.cascades += 1;
            for newly in graph.mark_transitive(unit) {
                if scheduled.insert(newly.clone()) {
                    queue.push_back(newly);
                }
            }
        }
    }

    info!(
        rebuilt = plan.rebuilt.len(),
        cascades = plan.cascades,
        "drive reached fixed point"
    );
    Ok(plan)
}
