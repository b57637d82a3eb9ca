//
//  builder.rs
//  Cascade
//
//  Created by hak (tharun)
//

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::engine::DepGraph;
use crate::config::Config;
use crate::error::{CascadeError, Result};
use crate::parser::FactSummary;

/// Directories that never hold fact summaries, skipped even without a
/// .gitignore.
const BUILTIN_IGNORE: &[&str] = &[".git", ".svn", ".hg", "node_modules", "__pycache__"];

/// Check if a path contains any built-in ignored directory.
fn is_builtin_ignored(path: &Path) -> bool {
    path.components().any(|c| {
        if let std::path::Component::Normal(name) = c {
            BUILTIN_IGNORE.contains(&name.to_str().unwrap_or(""))
        } else {
            false
        }
    })
}

/// One fact file the scan could not load.
#[derive(Debug, Clone, Serialize)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Result of scanning a tree for fact summaries.
#[derive(Debug)]
pub struct ScanOutcome {
    /// One node per loaded summary, keyed by file stem (the unit name).
    pub graph: DepGraph<String>,
    /// How many summaries loaded cleanly.
    pub loaded: usize,
    /// Files that failed to read or parse. A bad file never aborts the
    /// scan; the driver decides what to do with the survivors.
    pub failures: Vec<ScanFailure>,
}

/// Scan `root` for fact summary files and fold them into a fresh graph.
///
/// The walk honors `.gitignore` (per config) and the configured extra
/// ignore file. Files parse in parallel; loading happens serially in path
/// order so reverse-index bucket order is reproducible run to run.
pub fn scan_summaries(root: &Path, config: &Config) -> Result<ScanOutcome> {
    if !root.is_dir() {
        return Err(CascadeError::RootNotFound(root.to_path_buf()));
    }

    let files: Vec<PathBuf> = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(config.scan.respect_gitignore)
        .git_global(config.scan.respect_gitignore)
        .git_exclude(config.scan.respect_gitignore)
        .add_custom_ignore_filename(&config.scan.ignore_file)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter(|entry| !is_builtin_ignored(entry.path()))
        .filter(|entry| {
            entry.path().extension().and_then(|e| e.to_str())
                == Some(config.scan.extension.as_str())
        })
        .map(|entry| entry.into_path())
        .collect();

    info!(root = %root.display(), files = files.len(), "scanning fact summaries");

    type Parsed = (PathBuf, std::result::Result<FactSummary, String>);
    let parsed: Mutex<Vec<Parsed>> = Mutex::new(Vec::with_capacity(files.len()));

    files.par_iter().for_each(|path| {
        let outcome = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| FactSummary::parse(&text).map_err(|e| e.to_string()));
        if let Ok(mut entries) = parsed.lock() {
            entries.push((path.clone(), outcome));
        }
    });

    let mut parsed = parsed.into_inner().unwrap_or_default();
    parsed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut graph: DepGraph<String> = DepGraph::new();
    let mut loaded = 0;
    let mut failures = Vec::new();
    for (path, outcome) in parsed {
        match outcome {
            Ok(summary) => {
                let node = node_id(&path);
                if graph.contains(&node) {
                    warn!(unit = %node, path = %path.display(), "duplicate unit name; later summary replaces earlier");
                }
                graph.load_summary(node, &summary);
                loaded += 1;
            }
            Err(message) => {
                warn!(path = %path.display(), %message, "fact summary rejected");
                failures.push(ScanFailure { path, message });
            }
        }
    }

    debug!(loaded, failed = failures.len(), "scan complete");
    Ok(ScanOutcome {
        graph,
        loaded,
        failures,
    })
}

/// Node identifier for a fact file: its stem, i.e. the unit name.
pub fn node_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
