//! Testing utilities for data-prep jobs.
//!
//! Helpers for building small line-oriented corpora on disk and checking the
//! shape of shuffled and split outputs.
//!
//! # Quick Start
//!
//! ```no_run
//! use ironsplit::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let dir = scratch_dir()?;
//! let input = write_corpus(dir.path(), "reviews.csv", &numbered_lines(100))?;
//!
//! let lines = read_lines(&input)?;
//! assert_eq!(lines.len(), 100);
//! assert_no_trailing_terminator(&input);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A fresh temporary directory, removed on drop.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn scratch_dir() -> Result<TempDir> {
    TempDir::new().context("create scratch dir")
}

/// `count` distinct CSV-ish lines: `row-000000,value-0`, `row-000001,value-1`, ...
#[must_use]
pub fn numbered_lines(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("row-{i:06},value-{i}")).collect()
}

/// Write `lines` to `dir/name`, `\n`-separated, with no terminator after the
/// last line.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_corpus<S: AsRef<str>>(dir: &Path, name: &str, lines: &[S]) -> Result<PathBuf> {
    write_corpus_with(dir, name, lines, "\n", false)
}

/// Write `lines` to `dir/name` with an explicit `terminator`, optionally
/// terminating the last line too.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_corpus_with<S: AsRef<str>>(
    dir: &Path,
    name: &str,
    lines: &[S],
    terminator: &str,
    trailing: bool,
) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut body = lines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join(terminator);
    if trailing && !lines.is_empty() {
        body.push_str(terminator);
    }
    fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Lines of a `\n`-delimited file. An empty file has no lines.
///
/// A trailing terminator would show up as a final empty line, which is what
/// the output checks rely on.
///
/// # Errors
/// Returns an error if the file cannot be read as UTF-8.
pub fn read_lines(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    if content.is_empty() {
        return Ok(Vec::new());
    }
    Ok(content.split('\n').map(str::to_string).collect())
}

/// Assert that the file is empty or does not end with a line terminator.
///
/// # Panics
///
/// Panics if the file cannot be read or ends with `\n`.
pub fn assert_no_trailing_terminator(path: impl AsRef<Path>) {
    let path = path.as_ref();
    let bytes = fs::read(path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()));
    assert!(
        !bytes.ends_with(b"\n"),
        "{} ends with a line terminator",
        path.display()
    );
}

/// Assert that two collections hold the same elements with the same
/// multiplicities, in any order.
///
/// # Panics
///
/// Panics if the collections differ in length or content.
///
/// # Example
///
/// ```
/// use ironsplit::testing::assert_same_multiset;
///
/// assert_same_multiset(&["b", "a", "a"], &["a", "b", "a"]);
/// ```
pub fn assert_same_multiset<T: Debug + Ord + Clone>(actual: &[T], expected: &[T]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Collection length mismatch:\n  Expected length: {}\n  Actual length: {}",
        expected.len(),
        actual.len()
    );
    let mut a = actual.to_vec();
    let mut e = expected.to_vec();
    a.sort();
    e.sort();
    assert_eq!(a, e, "Collection content mismatch");
}
