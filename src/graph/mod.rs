//! Dependency graph module — the core of Cascade.
//!
//! Provides the graph data model, load/mark mutation operations, read-only
//! queries, and directory scanning for fact summary files.

pub mod builder;
pub mod engine;
pub mod mutation;
pub mod query;
pub mod types;

pub use builder::{node_id, scan_summaries, ScanFailure, ScanOutcome};
pub use engine::DepGraph;
pub use types::{Fact, FactKind, GraphStats, LoadResult, NodeRecord};
