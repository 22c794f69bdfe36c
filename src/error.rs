//! Error types for configuration.
//!
//! Pipeline stages report failures as [`anyhow::Error`] with path context;
//! only configuration problems get a typed error, since they are rejected
//! before any file is touched.

use std::path::PathBuf;
use thiserror::Error;

/// A configuration precondition that was violated at construction time.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The write batch size must be at least one line.
    #[error("batch size must be greater than zero")]
    ZeroBatchSize,

    /// No file extensions were given to filter on.
    #[error("extension allow-list is empty")]
    NoExtensions,

    /// An extension was empty or contained a path separator.
    #[error("invalid file extension: {0:?}")]
    InvalidExtension(String),

    /// The worker cap was set to zero.
    #[error("worker cap must be greater than zero")]
    ZeroWorkers,

    /// The input directory does not exist or is not a directory.
    #[error("input directory not found: {}", .0.display())]
    MissingInputDir(PathBuf),

    /// A configuration file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}
