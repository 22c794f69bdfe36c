//! # Ironsplit
//!
//! A **batch data-preparation library** for line-oriented corpora (CSV, plain
//! text). For every matching file in a directory it produces a uniformly
//! shuffled copy and, optionally, train/dev/test partitions sized by a
//! pluggable policy.
//!
//! ## Key Features
//!
//! - **Offset-indexed shuffling** - only `(offset, length)` pairs are held in memory
//! - **Exact partition accounting** - train + dev + test always equals the line count
//! - **Batched writes** - output is appended every `batch_size` lines
//! - **Clean file endings** - no output file ends with a blank line
//! - **Pluggable split policy** - override any of the three size bands
//! - **Parallel execution** - one task per file on a bounded rayon pool
//! - **Best-effort batches** - a failing file is logged and reported, the rest carry on
//!
//! ## Quick Start
//!
//! ```no_run
//! use ironsplit::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let cfg = PrepConfig::new("data", ["csv"])
//!     .shuffle_repeats(5)
//!     .batch_size(200);
//!
//! let report = Dispatcher::new(cfg)?.run()?;
//! println!("{} of {} files done", report.succeeded(), report.outcomes.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! Each file runs four stages in order on one worker:
//!
//! 1. [`index_lines`] - scan once, record where every line starts and how long it is
//! 2. [`shuffle_lines`] - permute the index
//! 3. [`rewrite_shuffled`] - seek to each line and write the shuffled copy to
//!    `processed_data_<YYYY-MM-DD>/<name>_shuffled.<ext>`
//! 4. [`split_file`] - stream the copy into `<name>_train`, `<name>_dev` and
//!    `<name>_test`
//!
//! ## Split Policy
//!
//! | Lines                  | train | dev  | test |
//! |------------------------|-------|------|------|
//! | `< 1_000`              | 0.70  | 0.00 | 0.30 |
//! | `1_000 ..< 1_000_000`  | 0.60  | 0.20 | 0.20 |
//! | `>= 1_000_000`         | 0.98  | 0.10 | 0.10 |
//!
//! Dev and test are floored; train takes the remainder. Implement
//! [`SplitPolicy`] or use [`BandOverrides`] to change any band.
//!
//! ## Logging
//!
//! Progress and per-file failures are emitted as `tracing` events. Call
//! [`observability::init_tracing`] to print them.

pub mod config;
pub mod error;
pub mod index;
pub mod io;
pub mod observability;
pub mod policy;
pub mod rewrite;
pub mod runner;
pub mod shuffle;
pub mod split;
pub mod testing;

pub use config::{ExecMode, PrepConfig};
pub use error::ConfigError;
pub use index::{LineDescriptor, index_lines};
pub use io::discover::{discover_files, expand_glob};
pub use policy::{
    BandOverrides, DefaultSplitPolicy, SplitBand, SplitPlan, SplitPolicy, SplitRatios,
};
pub use rewrite::{RunMetadata, processed_dir, rewrite_shuffled, shuffled_path};
pub use runner::{Dispatcher, FileOutcome, FileStatus, JobReport, Stage, process_file};
pub use shuffle::{file_rng, shuffle_lines};
pub use split::{SplitOutputs, split_file};
