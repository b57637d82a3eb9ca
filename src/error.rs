//
//  error.rs
//  Cascade
//
//  Created by hak (tharun)
//

use std::path::PathBuf;

use crate::parser::ParseError;

/// Crate-wide error type. Library entry points that can fail for more than
/// one reason return this; the core graph operations keep their precise
/// [`ParseError`] signature.
#[derive(Debug, thiserror::Error)]
pub enum CascadeError {
    #[error("failed to parse fact summary: {0}")]
    Parse(#[from] ParseError),

    #[error("scan root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("rebuild of node {node} failed: {message}")]
    Rebuild { node: String, message: String },

    #[error("rebuild of node {node} produced a malformed fact summary: {source}")]
    BadSummary { node: String, source: ParseError },

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CascadeError>;
