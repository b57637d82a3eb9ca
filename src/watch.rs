//
//  watch.rs
//  Cascade
//
//  Created by hak (tharun)
//

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Watches the graph's recorded external dependency paths and reports
/// which recorded path strings were touched, debounced per batch.
///
/// Event paths are mapped back to the strings the graph recorded, so the
/// caller can feed them straight into [`crate::graph::DepGraph::mark_external`].
pub struct ExternalWatcher {
    // Dropping the debouncer stops the underlying watcher threads.
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    rx: Receiver<DebounceEventResult>,
    recorded: HashMap<PathBuf, String>,
}

impl ExternalWatcher {
    /// Start watching every path in `paths`, resolved against `root`.
    ///
    /// Paths that do not exist (or cannot be watched) are skipped with a
    /// warning; the external marking that matters for them already happened
    /// at load time.
    pub fn start<'a, I>(root: &Path, paths: I, debounce: Duration) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut debouncer = new_debouncer(debounce, tx)?;

        let mut recorded: HashMap<PathBuf, String> = HashMap::new();
        let mut watched = 0usize;
        for path in paths {
            let resolved = resolve(root, path);
            if !resolved.exists() {
                warn!(path, "external dependency missing on disk; not watching");
                continue;
            }
            if let Err(e) = debouncer.watcher().watch(&resolved, RecursiveMode::NonRecursive) {
                warn!(path, error = %e, "could not watch external dependency");
                continue;
            }
            debug!(path, resolved = %resolved.display(), "watching external dependency");
            recorded.insert(resolved.clone(), path.to_string());
            // Some backends report canonicalized event paths.
            if let Ok(canonical) = resolved.canonicalize() {
                recorded.entry(canonical).or_insert_with(|| path.to_string());
            }
            watched += 1;
        }
        info!(watched, "external watcher started");

        Ok(Self {
            _debouncer: debouncer,
            rx,
            recorded,
        })
    }

    /// Block until a debounced batch touches at least one recorded path,
    /// returning the recorded path strings in event order. `None` means the
    /// watcher channel closed.
    pub fn next_batch(&self) -> Option<Vec<String>> {
        loop {
            match self.rx.recv() {
                Ok(Ok(events)) => {
                    let hits = map_events(&self.recorded, events.iter().map(|e| e.path.as_path()));
                    if !hits.is_empty() {
                        return Some(hits);
                    }
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "watch backend error");
                }
                Err(_) => return None,
            }
        }
    }
}

/// Resolve a recorded external path string against the project root.
/// Absolute strings are taken as-is, relative ones are joined to `root`.
pub(crate) fn resolve(root: &Path, recorded: &str) -> PathBuf {
    let path = Path::new(recorded);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Map event paths back to the recorded strings they were registered under,
/// deduplicated, preserving first-seen order.
pub(crate) fn map_events<'a, I>(recorded: &HashMap<PathBuf, String>, paths: I) -> Vec<String>
where
    I: Iterator<Item = &'a Path>,
{
    let mut hits: Vec<String> = Vec::new();
    for path in paths {
        let hit = recorded
            .get(path)
            .or_else(|| path.canonicalize().ok().and_then(|c| recorded.get(&c)));
        if let Some(name) = hit {
            if !hits.contains(name) {
                hits.push(name.clone());
            }
        }
    }
    hits
}
