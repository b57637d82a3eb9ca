//
//  config.rs
//  Cascade
//
//  Created by hak (tharun)
//

use std::fs;
use std::path::Path;

use serde::Deserialize;

/// Cascade configuration, loaded from `cascade.toml` in the scan root.
/// Every field has a default, so a missing or partial file is fine.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub watch: WatchConfig,
}

impl Config {
    /// Load `cascade.toml` from the given directory. Missing or malformed
    /// files fall back to the defaults.
    pub fn for_root(root: &Path) -> Self {
        Self::load(&root.join("cascade.toml"))
    }

    /// Load a config from an explicit path, defaulting on any failure.
    pub fn load(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|content| toml::from_str(&content).ok())
            .unwrap_or_default()
    }
}

/// Controls how fact summary files are discovered.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// File extension of fact summaries.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Honor `.gitignore` (and git excludes) while walking.
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,
    /// Extra per-directory ignore file, gitignore syntax.
    #[serde(default = "default_ignore_file")]
    pub ignore_file: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            respect_gitignore: true,
            ignore_file: default_ignore_file(),
        }
    }
}

/// Controls the external-dependency watcher.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Event debounce window in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_extension() -> String {
    "deps".to_string()
}

fn default_ignore_file() -> String {
    ".cascadeignore".to_string()
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    250
}
