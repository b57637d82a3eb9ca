//! CLI module for Cascade.
//!
//! Commands:
//! - Inspection: check, impact, stats, externals
//! - Output: export
//! - Long-running: watch

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::export::to_dot;
use crate::graph::{scan_summaries, ScanOutcome};
use crate::watch::ExternalWatcher;

#[derive(Parser)]
#[command(name = "cascade")]
#[command(about = "Cascade - coarse-grained incremental rebuild invalidation", long_about = None)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Config file (default: <root>/cascade.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    // ─── Inspection ───────────────────────────────────────────────
    /// Scan fact summaries under the root and report what loaded
    Check {
        /// Emit a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show which nodes one changed node or external path invalidates
    Impact {
        /// Node that changed (file stem of its fact summary)
        #[arg(short, long)]
        node: Option<String>,

        /// External dependency path that changed
        #[arg(short, long)]
        external: Option<String>,

        /// Emit a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show graph statistics
    Stats {
        /// Emit a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// List recorded external dependency paths
    Externals,

    // ─── Output ───────────────────────────────────────────────────
    /// Export the graph as Graphviz DOT
    Export {
        /// Write DOT to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    // ─── Long-running ─────────────────────────────────────────────
    /// Watch external dependencies and report invalidations on change
    Watch,
}

/// Dispatch a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path),
        None => Config::for_root(&cli.root),
    };

    match cli.command {
        Commands::Check { json } => check(&cli.root, &config, json),
        Commands::Impact {
            node,
            external,
            json,
        } => impact(&cli.root, &config, node, external, json),
        Commands::Stats { json } => stats(&cli.root, &config, json),
        Commands::Externals => externals(&cli.root, &config),
        Commands::Export { output } => export(&cli.root, &config, output.as_deref()),
        Commands::Watch => watch(&cli.root, &config),
    }
}

/// Scan and report loads and failures. Fails if any summary failed.
fn check(root: &Path, config: &Config, json: bool) -> Result<()> {
    let outcome = scan_summaries(root, config)?;

    if json {
        let report = serde_json::json!({
            "root": root.display().to_string(),
            "loaded": outcome.loaded,
            "stats": outcome.graph.stats(),
            "failures": outcome.failures,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "✓ Loaded {} fact summaries from {}",
            outcome.loaded,
            root.display()
        );
        if !outcome.failures.is_empty() {
            println!("Failures ({}):", outcome.failures.len());
            for failure in &outcome.failures {
                println!("  - {}: {}", failure.path.display(), failure.message);
            }
        }
    }

    if outcome.failures.is_empty() {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{} fact summaries failed to load",
            outcome.failures.len()
        ))
    }
}

/// Mark from one source and print the nodes that would need rebuilding.
fn impact(
    root: &Path,
    config: &Config,
    node: Option<String>,
    external: Option<String>,
    json: bool,
) -> Result<()> {
    let ScanOutcome { mut graph, .. } = scan_summaries(root, config)?;

    let invalidated = match (node, external) {
        (Some(name), None) => {
            if !graph.contains(&name) {
                anyhow::bail!("no fact summary loaded for node '{}'", name);
            }
            // The changed node itself rebuilds too; mark_transitive only
            // reports what it cascades to.
            let mut nodes = vec![name.clone()];
            nodes.extend(graph.mark_transitive(name));
            nodes
        }
        (None, Some(path)) => {
            if !graph.external_dependencies().contains(&path) {
                anyhow::bail!("'{}' is not a recorded external dependency", path);
            }
            graph.mark_external(&path)
        }
        (None, None) => anyhow::bail!("pass --node or --external"),
        (Some(_), Some(_)) => anyhow::bail!("pass only one of --node and --external"),
    };

    if json {
        let report = serde_json::json!({
            "count": invalidated.len(),
            "invalidated": invalidated,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if invalidated.is_empty() {
        println!("Nothing to rebuild.");
    } else {
        println!("✓ {} node(s) invalidated:", invalidated.len());
        for unit in &invalidated {
            println!("  - {}", unit);
        }
    }

    Ok(())
}

/// Print graph statistics.
fn stats(root: &Path, config: &Config, json: bool) -> Result<()> {
    let outcome = scan_summaries(root, config)?;
    let stats = outcome.graph.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Cascade Graph");
        println!("─────────────");
        println!("Nodes:          {} ({} marked)", stats.nodes, stats.marked);
        println!("Provided facts: {}", stats.provided_facts);
        println!("Depended facts: {}", stats.depended_facts);
        println!("External paths: {}", stats.external_paths);
    }

    Ok(())
}

/// List every recorded external dependency path.
fn externals(root: &Path, config: &Config) -> Result<()> {
    let outcome = scan_summaries(root, config)?;
    let paths = outcome.graph.external_dependencies();

    if paths.is_empty() {
        println!("No external dependencies recorded.");
    } else {
        println!("External dependencies ({}):", paths.len());
        for path in paths {
            println!("  - {}", path);
        }
    }

    Ok(())
}

/// Dump the graph as Graphviz DOT.
fn export(root: &Path, config: &Config, output: Option<&Path>) -> Result<()> {
    let outcome = scan_summaries(root, config)?;
    let dot = to_dot(&outcome.graph);

    match output {
        Some(path) => {
            std::fs::write(path, &dot)?;
            println!("✓ Wrote {}", path.display());
        }
        None => print!("{}", dot),
    }

    Ok(())
}

/// Watch external dependency paths; on change, mark and report.
///
/// Marks accumulate across batches, so a path touched twice reports the
/// cascade once and then only the already-marked suppression.
fn watch(root: &Path, config: &Config) -> Result<()> {
    let ScanOutcome {
        mut graph, loaded, ..
    } = scan_summaries(root, config)?;

    let paths = graph.external_dependencies().clone();
    if paths.is_empty() {
        println!("No external dependencies recorded; nothing to watch.");
        return Ok(());
    }

    let watcher = ExternalWatcher::start(
        root,
        paths.iter().map(String::as_str),
        Duration::from_millis(config.watch.debounce_ms),
    )?;
    println!(
        "✓ Watching {} external dependencies across {} nodes (Ctrl-C to stop)",
        paths.len(),
        loaded
    );

    while let Some(batch) = watcher.next_batch() {
        for path in batch {
            let invalidated = graph.mark_external(&path);
            if invalidated.is_empty() {
                println!("{} changed; all dependents already marked", path);
            } else {
                println!("✓ {} changed; {} node(s) invalidated:", path, invalidated.len());
                for unit in &invalidated {
                    println!("  - {}", unit);
                }
            }
        }
    }

    Ok(())
}
