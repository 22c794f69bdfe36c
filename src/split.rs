//! Train/dev/test partitioning of a shuffled file.
//!
//! The shuffled file is streamed once. Positions `1..=train` go to the train
//! file, the next `dev` lines to dev, and the rest to test, so concatenating
//! the three partitions in that order gives back the shuffled file.
//! Each partition is `\n`-delimited with no terminator after its last line.
//! The shuffled file is read as `\n`-separated records, the same way the
//! rewrite wrote it, so `n - 1` separators always mean `n` lines.

use crate::policy::{SplitPlan, SplitPolicy};
use crate::rewrite::{RunMetadata, sibling_path};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Paths of the three partition files and the plan that filled them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SplitOutputs {
    pub train: PathBuf,
    pub dev: PathBuf,
    pub test: PathBuf,
    pub plan: SplitPlan,
}

/// Split the shuffled file described by `metadata` into
/// `<stem>_train.<ext>`, `<stem>_dev.<ext>` and `<stem>_test.<ext>` next to it.
///
/// All three files are created even when a partition is empty. Buffers are
/// flushed together every `batch_size` input lines.
///
/// # Errors
/// Returns an error if the shuffled file cannot be read or a partition file
/// cannot be created or written. Partition files may be incomplete then.
pub fn split_file(
    metadata: &RunMetadata,
    policy: &dyn SplitPolicy,
    batch_size: usize,
) -> Result<SplitOutputs> {
    let src = &metadata.output_path;
    let n = metadata.line_count;
    let plan = SplitPlan::new(n, policy.ratios_for(n));
    debug!(
        file = %src.display(),
        lines = n,
        train = plan.train,
        dev = plan.dev,
        test = plan.test,
        "split plan"
    );

    let stem = original_name(src);
    let dir = &metadata.output_dir;
    let mut train = Partition::create(sibling_path(dir, &stem, "train"))?;
    let mut dev = Partition::create(sibling_path(dir, &stem, "dev"))?;
    let mut test = Partition::create(sibling_path(dir, &stem, "test"))?;

    let f = File::open(src).with_context(|| format!("open {}", src.display()))?;
    let mut rdr = BufReader::new(f);
    let batch_size = batch_size.max(1) as u64;
    let mut line = Vec::new();
    let mut pos: u64 = 0;
    // Records are `\n`-separated: a file ending in a separator still has an
    // empty last record, written when the last line was blank.
    let mut after_separator = false;
    loop {
        line.clear();
        let consumed = rdr
            .read_until(b'\n', &mut line)
            .with_context(|| format!("read line {} in {}", pos + 1, src.display()))?;
        if consumed == 0 {
            if !after_separator {
                break;
            }
            after_separator = false;
        } else {
            after_separator = line.last() == Some(&b'\n');
        }
        pos += 1;
        let content = line.strip_suffix(b"\n").unwrap_or(&line);
        if pos <= plan.train_end() {
            train.push(content);
        } else if pos <= plan.dev_end() {
            dev.push(content);
        } else {
            test.push(content);
        }

        if pos % batch_size == 0 {
            for p in [&mut train, &mut dev, &mut test] {
                p.flush()?;
            }
        }
    }
    for p in [&mut train, &mut dev, &mut test] {
        p.flush()?;
    }

    Ok(SplitOutputs {
        train: train.path,
        dev: dev.path,
        test: test.path,
        plan,
    })
}

/// Name the partitions after the input, not after the shuffled copy:
/// `name_shuffled.csv` becomes `name.csv`.
fn original_name(shuffled: &Path) -> PathBuf {
    let stem = shuffled
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = stem.strip_suffix("_shuffled").unwrap_or(&stem);
    match shuffled.extension() {
        Some(ext) => PathBuf::from(format!("{stem}.{}", ext.to_string_lossy())),
        None => PathBuf::from(stem),
    }
}

/// One output partition: a file plus its pending batch.
struct Partition {
    path: PathBuf,
    out: File,
    buf: Vec<u8>,
    started: bool,
}

impl Partition {
    fn create(path: PathBuf) -> Result<Self> {
        let out = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        Ok(Self {
            path,
            out,
            buf: Vec::new(),
            started: false,
        })
    }

    /// The separator goes before every line but the partition's first, so
    /// the last line ends up unterminated.
    fn push(&mut self, line: &[u8]) {
        if self.started {
            self.buf.push(b'\n');
        }
        self.buf.extend_from_slice(line);
        self.started = true;
    }

    fn flush(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.out
            .write_all(&self.buf)
            .with_context(|| format!("write {}", self.path.display()))?;
        self.buf.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::original_name;
    use std::path::{Path, PathBuf};

    #[test]
    fn partitions_are_named_after_the_input() {
        assert_eq!(
            original_name(Path::new("/out/reviews_shuffled.csv")),
            PathBuf::from("reviews.csv")
        );
        assert_eq!(
            original_name(Path::new("/out/corpus_shuffled")),
            PathBuf::from("corpus")
        );
    }
}
