//! Input discovery: find the files a job should process.
//!
//! Discovery is non-recursive and filtered by extension. It is built on glob
//! patterns, so [`expand_glob`] is also available for callers that want to
//! pick files themselves.
//!
//! # Examples
//!
//! ```no_run
//! use ironsplit::io::discover::{discover_files, expand_glob};
//!
//! // Every .csv and .txt file directly under data/
//! let files = discover_files("data", &["csv", "txt"])?;
//!
//! // Any pattern at all
//! let partitions = expand_glob("data/year=2024/*.csv")?;
//! # use anyhow::Error; Ok::<(), Error>(())
//! ```

use anyhow::{Context, Result, bail};
use glob::{Pattern, glob};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Expand a glob pattern into the sorted regular files it matches.
///
/// Directories, sockets and other non-regular entries are skipped and logged
/// at debug level. Symlinks count when their target is a regular file.
/// No matches is an empty vector, not an error.
///
/// # Errors
/// Returns an error if the pattern is invalid or a matched entry cannot be
/// read.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.with_context(|| format!("read match of {pattern}"))?;
        if is_regular_file(&path)? {
            files.push(path);
        } else {
            debug!(path = %path.display(), "not a regular file, skipped");
        }
    }
    files.sort_unstable();
    Ok(files)
}

/// Follows symlinks. A dangling link is not a file.
fn is_regular_file(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.file_type().is_file()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("stat {}", path.display())),
    }
}

/// List the regular files directly inside `dir` whose extension is in
/// `extensions` (given without the leading dot).
///
/// Results are sorted and free of duplicates, so listing an extension twice
/// is harmless.
///
/// # Errors
///
/// Returns an error if `dir` is not a readable directory or a directory
/// entry cannot be read.
pub fn discover_files<S: AsRef<str>>(
    dir: impl AsRef<Path>,
    extensions: &[S],
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        bail!("not a directory: {}", dir.display());
    }
    let base = Pattern::escape(&dir.to_string_lossy());

    let mut result = Vec::new();
    for ext in extensions {
        let ext = ext.as_ref().trim_start_matches('.');
        let pattern = format!("{base}/*.{}", Pattern::escape(ext));
        result.extend(expand_glob(&pattern)?);
    }
    result.sort_unstable();
    result.dedup();
    Ok(result)
}
