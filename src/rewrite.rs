//! Shuffled rewrite: materialize a shuffled line index as a new file.
//!
//! Lines are re-read from the source by seeking to each descriptor's offset,
//! buffered, and appended to the output in batches. The output is a sequence
//! of `\n`-separated lines: no terminator follows the last line, whatever the
//! batch size. A last line that trims to nothing therefore shows up only as a
//! final separator, and `n` lines always mean `n - 1` separators.
//!
//! Mid-stream failures do not fail the call: they are logged, the output is
//! left truncated, and the returned [`RunMetadata`] says so.

use crate::index::LineDescriptor;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs::{File, create_dir_all};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// What the rewrite produced for one input file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunMetadata {
    /// Size of the shuffled file in bytes.
    pub byte_size: u64,
    /// Lines actually written to the shuffled file.
    pub line_count: u64,
    /// Absolute path of the shuffled file.
    pub output_path: PathBuf,
    /// Directory holding the shuffled file; split outputs go here too.
    pub output_dir: PathBuf,
    /// Set when a read or write failure cut the rewrite short.
    pub truncated: bool,
}

/// `<root>/processed_data_<YYYY-MM-DD>`
#[must_use]
pub fn processed_dir(root: impl AsRef<Path>, date: NaiveDate) -> PathBuf {
    root.as_ref()
        .join(format!("processed_data_{}", date.format("%Y-%m-%d")))
}

/// `<dir>/<stem>_shuffled.<ext>`
#[must_use]
pub fn shuffled_path(dir: impl AsRef<Path>, input: impl AsRef<Path>) -> PathBuf {
    sibling_path(dir.as_ref(), input.as_ref(), "shuffled")
}

/// `<dir>/<stem>_<suffix>.<ext>`, dropping the dot when `input` has no extension.
pub(crate) fn sibling_path(dir: &Path, input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{stem}_{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{suffix}"),
    };
    dir.join(name)
}

/// Write the lines of `source` to `output`, in the order given by `lines`.
///
/// Lines are flushed every `batch_size` lines. Each line has trailing ASCII
/// whitespace trimmed.
///
/// # Errors
/// Returns an error only when the output directory or file cannot be
/// created, or when the finished file's size cannot be read. Failures while
/// copying lines are logged and reported via [`RunMetadata::truncated`].
pub fn rewrite_shuffled(
    source: impl AsRef<Path>,
    lines: &[LineDescriptor],
    batch_size: usize,
    output: impl AsRef<Path>,
) -> Result<RunMetadata> {
    let source = source.as_ref();
    let output = output.as_ref();
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    // Truncate up front; batches are appended below.
    let out = File::create(output).with_context(|| format!("create {}", output.display()))?;

    let mut batch = LineBatch::new(out, batch_size);
    let truncated = match copy_lines(source, lines, &mut batch) {
        Ok(()) => false,
        Err(e) => {
            error!(
                file = %source.display(),
                written = batch.written,
                error = %format!("{e:#}"),
                "shuffled rewrite stopped early"
            );
            true
        }
    };

    let output_path = std::path::absolute(output)
        .with_context(|| format!("resolve {}", output.display()))?;
    let output_dir = output_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let byte_size = std::fs::metadata(&output_path)
        .with_context(|| format!("stat {}", output_path.display()))?
        .len();

    debug!(
        file = %source.display(),
        lines = batch.written,
        bytes = byte_size,
        "shuffled rewrite done"
    );
    Ok(RunMetadata {
        byte_size,
        line_count: batch.written,
        output_path,
        output_dir,
        truncated,
    })
}

fn copy_lines(source: &Path, lines: &[LineDescriptor], batch: &mut LineBatch) -> Result<()> {
    let mut src = File::open(source).with_context(|| format!("open {}", source.display()))?;
    let mut line = Vec::new();
    for d in lines {
        src.seek(SeekFrom::Start(d.offset))
            .with_context(|| format!("seek to {} in {}", d.offset, source.display()))?;
        line.resize(d.length as usize, 0);
        src.read_exact(&mut line).with_context(|| {
            format!("read {} bytes at {} in {}", d.length, d.offset, source.display())
        })?;
        batch.push(trim_end(&line))?;
    }
    batch.flush()
}

/// Buffered line sink that writes the separator before every line but the
/// first, so no terminator follows the last line.
struct LineBatch {
    out: File,
    buf: Vec<u8>,
    pending: usize,
    batch_size: usize,
    written: u64,
}

impl LineBatch {
    fn new(out: File, batch_size: usize) -> Self {
        Self {
            out,
            buf: Vec::new(),
            pending: 0,
            batch_size: batch_size.max(1),
            written: 0,
        }
    }

    fn push(&mut self, line: &[u8]) -> Result<()> {
        if self.written > 0 || self.pending > 0 {
            self.buf.push(b'\n');
        }
        self.buf.extend_from_slice(line);
        self.pending += 1;
        if self.pending == self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.pending == 0 {
            return Ok(());
        }
        self.out.write_all(&self.buf).context("append batch")?;
        self.written += self.pending as u64;
        self.buf.clear();
        self.pending = 0;
        Ok(())
    }
}

fn trim_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_end_drops_trailing_whitespace_only() {
        assert_eq!(trim_end(b"  a b \r\t"), b"  a b");
        assert_eq!(trim_end(b"   "), b"");
        assert_eq!(trim_end(b""), b"");
    }

    #[test]
    fn names_follow_input_stem_and_extension() {
        let dir = Path::new("/out");
        assert_eq!(
            shuffled_path(dir, "/data/train.csv"),
            PathBuf::from("/out/train_shuffled.csv")
        );
        assert_eq!(
            sibling_path(dir, Path::new("corpus"), "dev"),
            PathBuf::from("/out/corpus_dev")
        );
    }

    #[test]
    fn processed_dir_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            processed_dir("/work", date),
            PathBuf::from("/work/processed_data_2024-03-07")
        );
    }
}
