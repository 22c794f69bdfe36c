//! Job configuration.
//!
//! A [`PrepConfig`] is fixed for the lifetime of a job and shared read-only by
//! every file's pipeline. It can be built in code or loaded from JSON:
//!
//! ```no_run
//! use ironsplit::config::PrepConfig;
//!
//! # fn main() -> anyhow::Result<()> {
//! let cfg = PrepConfig::new("data", ["csv"])
//!     .shuffle_repeats(5)
//!     .batch_size(200)
//!     .seed(42);
//! cfg.validate()?;
//!
//! let from_disk = PrepConfig::from_json_file("prep.json")?;
//! # Ok(())
//! # }
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How the dispatcher schedules per-file pipelines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecMode {
    /// One file after another on the calling thread.
    Sequential,
    /// One task per file on a bounded worker pool.
    Parallel { threads: Option<usize> },
}

impl Default for ExecMode {
    fn default() -> Self {
        Self::Parallel { threads: None }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    /// Directory scanned (non-recursively) for input files.
    pub input_dir: PathBuf,
    /// Extensions to pick up, without the leading dot.
    pub extensions: Vec<String>,
    /// Number of shuffle passes per file.
    pub shuffle_repeats: usize,
    /// Lines buffered before each write.
    pub batch_size: usize,
    /// Where `processed_data_<date>/` is created.
    pub output_root: PathBuf,
    /// Produce train/dev/test files after shuffling.
    pub split: bool,
    /// Fixed seed for reproducible shuffles; entropy when unset.
    pub seed: Option<u64>,
    /// Cap on concurrent file pipelines; defaults to twice the CPU count.
    pub max_workers: Option<usize>,
    pub mode: ExecMode,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            extensions: Vec::new(),
            shuffle_repeats: 1,
            batch_size: 1_000,
            output_root: PathBuf::from("."),
            split: true,
            seed: None,
            max_workers: None,
            mode: ExecMode::default(),
        }
    }
}

impl PrepConfig {
    #[must_use]
    pub fn new<I, S>(input_dir: impl Into<PathBuf>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input_dir: input_dir.into(),
            extensions: extensions.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn shuffle_repeats(mut self, repeats: usize) -> Self {
        self.shuffle_repeats = repeats;
        self
    }

    #[must_use]
    pub fn batch_size(mut self, lines: usize) -> Self {
        self.batch_size = lines;
        self
    }

    #[must_use]
    pub fn output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    #[must_use]
    pub fn split(mut self, enabled: bool) -> Self {
        self.split = enabled;
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: ExecMode) -> Self {
        self.mode = mode;
        self
    }

    /// Load a config from a JSON file. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`], or whatever
    /// [`validate`](Self::validate) rejects.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every precondition the pipeline relies on.
    ///
    /// # Errors
    /// Returns the first violated precondition.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::NoExtensions);
        }
        for ext in &self.extensions {
            let bare = ext.trim_start_matches('.');
            if bare.is_empty() || bare.contains(['/', '\\']) {
                return Err(ConfigError::InvalidExtension(ext.clone()));
            }
        }
        if self.max_workers == Some(0) || self.mode == (ExecMode::Parallel { threads: Some(0) }) {
            return Err(ConfigError::ZeroWorkers);
        }
        if !self.input_dir.is_dir() {
            return Err(ConfigError::MissingInputDir(self.input_dir.clone()));
        }
        Ok(())
    }

    /// Extensions with any leading dot removed.
    #[must_use]
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_string())
            .collect()
    }

    /// Worker pool size for `file_count` files.
    #[must_use]
    pub fn worker_count(&self, file_count: usize) -> usize {
        let cap = match self.mode {
            ExecMode::Parallel { threads: Some(t) } => t,
            _ => self.max_workers.unwrap_or_else(|| num_cpus::get() * 2),
        };
        file_count.min(cap).max(1)
    }
}
