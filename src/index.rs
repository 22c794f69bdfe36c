//! Line indexing: locate every line of a file by byte offset and length.
//!
//! The index is what makes the shuffle cheap: only `(offset, length)` pairs
//! are held in memory, and line content is re-read from the source by
//! seeking when the shuffled copy is written.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Location of one line in a source file.
///
/// `length` excludes the line terminator (`\n` or `\r\n`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct LineDescriptor {
    pub offset: u64,
    pub length: u32,
}

impl LineDescriptor {
    #[must_use]
    pub const fn new(offset: u64, length: u32) -> Self {
        Self { offset, length }
    }
}

/// Scan `path` once and return one descriptor per line, in source order.
///
/// A final line without a terminator is still indexed; an empty file yields
/// an empty vector.
///
/// # Errors
/// Returns an error if the file cannot be opened or read, or if a single line
/// is longer than `u32::MAX` bytes.
pub fn index_lines(path: impl AsRef<Path>) -> Result<Vec<LineDescriptor>> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut rdr = BufReader::new(f);

    let mut out = Vec::new();
    let mut scratch = Vec::new();
    let mut offset: u64 = 0;
    loop {
        scratch.clear();
        let consumed = rdr
            .read_until(b'\n', &mut scratch)
            .with_context(|| format!("read line {} in {}", out.len() + 1, path.display()))?;
        if consumed == 0 {
            break;
        }
        let content = content_len(&scratch);
        let Ok(length) = u32::try_from(content) else {
            bail!(
                "line {} in {} is {content} bytes, longer than supported",
                out.len() + 1,
                path.display()
            );
        };
        out.push(LineDescriptor { offset, length });
        // Terminator width is whatever was consumed beyond the content.
        offset += consumed as u64;
    }
    Ok(out)
}

/// Length of `line` without its trailing `\n` or `\r\n`.
fn content_len(line: &[u8]) -> usize {
    match line {
        [rest @ .., b'\r', b'\n'] | [rest @ .., b'\n'] => rest.len(),
        _ => line.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::content_len;

    #[test]
    fn content_len_strips_known_terminators() {
        assert_eq!(content_len(b"abc\n"), 3);
        assert_eq!(content_len(b"abc\r\n"), 3);
        assert_eq!(content_len(b"abc"), 3);
        assert_eq!(content_len(b"\n"), 0);
        assert_eq!(content_len(b""), 0);
        assert_eq!(content_len(b"a\rb"), 3);
    }
}
