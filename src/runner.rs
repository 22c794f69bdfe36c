use crate::config::{ExecMode, PrepConfig};
use crate::error::ConfigError;
use crate::index::index_lines;
use crate::io::discover::discover_files;
use crate::policy::{DefaultSplitPolicy, SplitPolicy};
use crate::rewrite::{RunMetadata, processed_dir, rewrite_shuffled, shuffled_path};
use crate::shuffle::{file_rng, shuffle_lines};
use crate::split::{SplitOutputs, split_file};
use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};
#[cfg(not(feature = "parallel-io"))]
use tracing::warn;

/// Pipeline stage a file failed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Index,
    Rewrite,
    Split,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Index => "index",
            Self::Rewrite => "rewrite",
            Self::Split => "split",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    /// The shuffled copy exists; `splits` is `None` when splitting is off.
    Completed {
        metadata: RunMetadata,
        splits: Option<SplitOutputs>,
    },
    Failed { stage: Stage, message: String },
}

/// Result of one file's pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub status: FileStatus,
}

impl FileOutcome {
    /// Completed, and the shuffled copy was not cut short.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(
            &self.status,
            FileStatus::Completed { metadata, .. } if !metadata.truncated
        )
    }

    #[must_use]
    pub const fn metadata(&self) -> Option<&RunMetadata> {
        match &self.status {
            FileStatus::Completed { metadata, .. } => Some(metadata),
            FileStatus::Failed { .. } => None,
        }
    }

    #[must_use]
    pub const fn splits(&self) -> Option<&SplitOutputs> {
        match &self.status {
            FileStatus::Completed { splits, .. } => splits.as_ref(),
            FileStatus::Failed { .. } => None,
        }
    }
}

/// Per-file outcomes of a whole job, in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub outcomes: Vec<FileOutcome>,
}

impl JobReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Outcomes that failed or were truncated.
    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(FileOutcome::is_success)
    }

    #[must_use]
    pub fn outcome(&self, input: impl AsRef<Path>) -> Option<&FileOutcome> {
        let input = input.as_ref();
        self.outcomes.iter().find(|o| o.input == input)
    }
}

/// Run index → shuffle → rewrite → split for one file.
///
/// Never fails: errors are logged and recorded in the returned outcome.
pub fn process_file(
    cfg: &PrepConfig,
    policy: &dyn SplitPolicy,
    input: &Path,
    run_date: NaiveDate,
) -> FileOutcome {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!(file = %name, "data processing started");

    let status = match run_stages(cfg, policy, input, &name, run_date) {
        Ok((metadata, splits)) => {
            info!(
                file = %name,
                lines = metadata.line_count,
                truncated = metadata.truncated,
                "data processing finished"
            );
            FileStatus::Completed { metadata, splits }
        }
        Err((stage, e)) => {
            let message = format!("{e:#}");
            error!(file = %name, %stage, error = %message, "data processing failed");
            FileStatus::Failed { stage, message }
        }
    };
    FileOutcome {
        input: input.to_path_buf(),
        status,
    }
}

type StageResult<T> = std::result::Result<T, (Stage, anyhow::Error)>;

fn run_stages(
    cfg: &PrepConfig,
    policy: &dyn SplitPolicy,
    input: &Path,
    name: &str,
    run_date: NaiveDate,
) -> StageResult<(RunMetadata, Option<SplitOutputs>)> {
    let mut lines = index_lines(input).map_err(|e| (Stage::Index, e))?;
    debug!(file = %name, lines = lines.len(), "indexed");

    let mut rng = file_rng(cfg.seed, name);
    shuffle_lines(&mut lines, cfg.shuffle_repeats, &mut rng);

    let out_dir = processed_dir(&cfg.output_root, run_date);
    let metadata = rewrite_shuffled(input, &lines, cfg.batch_size, shuffled_path(&out_dir, input))
        .map_err(|e| (Stage::Rewrite, e))?;
    drop(lines);

    if !cfg.split {
        return Ok((metadata, None));
    }
    info!(file = %name, "splitting started");
    let splits = split_file(&metadata, policy, cfg.batch_size).map_err(|e| (Stage::Split, e))?;
    info!(
        file = %name,
        train = splits.plan.train,
        dev = splits.plan.dev,
        test = splits.plan.test,
        "splitting finished"
    );
    Ok((metadata, Some(splits)))
}

/// Fans a job out over every matching file in the input directory.
///
/// ```no_run
/// use ironsplit::config::PrepConfig;
/// use ironsplit::runner::Dispatcher;
///
/// # fn main() -> anyhow::Result<()> {
/// let report = Dispatcher::new(PrepConfig::new("data", ["csv"]).batch_size(200))?.run()?;
/// for failed in report.failures() {
///     eprintln!("{}: {:?}", failed.input.display(), failed.status);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Dispatcher {
    cfg: PrepConfig,
    policy: Arc<dyn SplitPolicy>,
}

impl Dispatcher {
    /// # Errors
    /// Returns the first configuration precondition that does not hold.
    pub fn new(cfg: PrepConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            policy: Arc::new(DefaultSplitPolicy),
        })
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn SplitPolicy>) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &PrepConfig {
        &self.cfg
    }

    /// Process every file and wait for all of them.
    ///
    /// # Errors
    /// Fails only if the input directory cannot be listed or the worker pool
    /// cannot be started. Per-file failures are in the report.
    pub fn run(&self) -> Result<JobReport> {
        self.run_on(chrono::Local::now().date_naive())
    }

    /// [`run`](Self::run) with a fixed date for the output directory name.
    ///
    /// # Errors
    /// Same as [`run`](Self::run).
    pub fn run_on(&self, run_date: NaiveDate) -> Result<JobReport> {
        let extensions = self.cfg.normalized_extensions();
        let files = discover_files(&self.cfg.input_dir, extensions.as_slice())?;
        info!(file_count = files.len(), "jobs submitted to data pipeline");

        let policy = self.policy.as_ref();
        let process = |f: &PathBuf| process_file(&self.cfg, policy, f, run_date);
        let outcomes: Vec<FileOutcome> = match self.cfg.mode {
            ExecMode::Sequential => files.iter().map(process).collect(),
            ExecMode::Parallel { .. } => self.run_parallel(&files, process)?,
        };

        let report = JobReport { outcomes };
        info!(
            succeeded = report.succeeded(),
            failed = report.outcomes.len() - report.succeeded(),
            "data processing done"
        );
        Ok(report)
    }

    #[cfg(feature = "parallel-io")]
    fn run_parallel<F>(&self, files: &[PathBuf], process: F) -> Result<Vec<FileOutcome>>
    where
        F: Fn(&PathBuf) -> FileOutcome + Sync + Send,
    {
        use anyhow::Context;
        use rayon::prelude::*;
        if files.is_empty() {
            return Ok(Vec::new());
        }
        let workers = self.cfg.worker_count(files.len());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("ironsplit-worker-{i}"))
            .build()
            .context("build worker pool")?;
        debug!(workers, "worker pool ready");
        // `install` returns once every task has finished.
        Ok(pool.install(|| files.par_iter().map(process).collect()))
    }

    #[cfg(not(feature = "parallel-io"))]
    fn run_parallel<F>(&self, files: &[PathBuf], process: F) -> Result<Vec<FileOutcome>>
    where
        F: Fn(&PathBuf) -> FileOutcome + Sync + Send,
    {
        warn!(
            files = files.len(),
            "built without the parallel-io feature, running files sequentially"
        );
        Ok(files.iter().map(process).collect())
    }
}
