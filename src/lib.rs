//! # Cascade
//!
//! Coarse-grained incremental rebuild invalidation.
//!
//! Cascade keeps a graph of compilation units keyed by the facts they
//! provide and depend on, and answers one question fast: after this unit
//! (or this external file) changed, which units need recompiling?
//!
//! ## Key Features
//!
//! - **Fact-based**: Units are linked by named facts (top-level names,
//!   nominal types, members, dynamic lookups), not by parsed source
//! - **Transitive marking**: One change cascades through every downstream
//!   dependent, each node visited at most once
//! - **Memoized**: Already-marked nodes are never re-expanded or re-reported
//! - **Textual summaries**: Per-unit fact lists load from a small YAML-style
//!   format emitted alongside each compile
//!
//! ## Quick Start
//!
//! ```rust
//! use cascade::DepGraph;
//!
//! let mut graph: DepGraph<&str> = DepGraph::new();
//! graph.load_from_str("core", "provides-top-level: [Session]").unwrap();
//! graph.load_from_str("ui", "depends-top-level: [Session]").unwrap();
//!
//! // Changing core invalidates ui.
//! assert_eq!(graph.mark_transitive("core"), vec!["ui"]);
//! ```

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod export;
pub mod graph;
pub mod parser;
pub mod watch;

// Re-exports for convenience
pub use config::Config;
pub use driver::{drive, Plan};
pub use error::{CascadeError, Result};
pub use export::to_dot;
pub use graph::{
    node_id, scan_summaries, DepGraph, Fact, FactKind, GraphStats, LoadResult, NodeRecord,
    ScanFailure, ScanOutcome,
};
pub use parser::{FactSummary, ParseError};
pub use watch::ExternalWatcher;
