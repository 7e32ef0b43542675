//! Server error types.

use std::path::PathBuf;

/// Server error.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Build directory does not exist.
    #[error("Build directory not found: {}", .0.display())]
    BuildDirMissing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Invalid watch pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Cannot render client script: {0}")]
    ClientScript(#[from] serde_json::Error),
}
