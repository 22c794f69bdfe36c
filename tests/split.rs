use anyhow::Result;
use ironsplit::testing::*;
use ironsplit::{
    BandOverrides, DefaultSplitPolicy, RunMetadata, SplitPlan, SplitRatios, file_rng, index_lines,
    rewrite_shuffled, shuffle_lines, split_file,
};
use std::fs;
use std::path::Path;

/// Index, shuffle and rewrite `lines` into `<dir>/out/<name>` form.
fn shuffled(dir: &Path, name: &str, lines: &[String], batch: usize) -> Result<RunMetadata> {
    let input = write_corpus(dir, name, lines)?;
    let mut idx = index_lines(&input)?;
    shuffle_lines(&mut idx, 1, &mut file_rng(Some(3), name));
    let stem = name.split('.').next().unwrap_or(name);
    let out = dir.join("out").join(format!("{stem}_shuffled.csv"));
    rewrite_shuffled(&input, &idx, batch, out)
}

#[test]
fn hundred_line_scenario() -> Result<()> {
    let dir = scratch_dir()?;
    let meta = shuffled(dir.path(), "a.csv", &numbered_lines(100), 200)?;
    assert_eq!(meta.line_count, 100);

    let out = split_file(&meta, &DefaultSplitPolicy, 200)?;
    assert_eq!(out.plan, SplitPlan { train: 70, dev: 0, test: 30 });
    assert!(out.train.ends_with("out/a_train.csv"));
    assert!(out.dev.ends_with("out/a_dev.csv"));
    assert!(out.test.ends_with("out/a_test.csv"));

    assert_eq!(read_lines(&out.train)?.len(), 70);
    assert_eq!(fs::metadata(&out.dev)?.len(), 0);
    assert_eq!(read_lines(&out.test)?.len(), 30);
    Ok(())
}

#[test]
fn partitions_concatenate_to_the_shuffled_file() -> Result<()> {
    let dir = scratch_dir()?;
    let meta = shuffled(dir.path(), "b.csv", &numbered_lines(10_000), 333)?;

    for batch in [1, 64, 2_000, 50_000] {
        let out = split_file(&meta, &DefaultSplitPolicy, batch)?;
        assert_eq!(out.plan, SplitPlan { train: 6_000, dev: 2_000, test: 2_000 });

        let train = read_lines(&out.train)?;
        let dev = read_lines(&out.dev)?;
        let test = read_lines(&out.test)?;
        assert_eq!(train.len(), 6_000);
        assert_eq!(dev.len(), 2_000);
        assert_eq!(test.len(), 2_000);

        let joined: Vec<String> = train.into_iter().chain(dev).chain(test).collect();
        assert_eq!(joined, read_lines(&meta.output_path)?, "batch size {batch}");
    }
    Ok(())
}

#[test]
fn every_partition_ends_without_terminator() -> Result<()> {
    let dir = scratch_dir()?;
    let meta = shuffled(dir.path(), "c.csv", &numbered_lines(1_500), 100)?;

    // 1_500 lines: 900 / 300 / 300, all batch-aligned at 100.
    let out = split_file(&meta, &DefaultSplitPolicy, 100)?;
    for p in [&out.train, &out.dev, &out.test] {
        assert_no_trailing_terminator(p);
        assert!(read_lines(p)?.iter().all(|l| !l.is_empty()));
    }
    Ok(())
}

#[test]
fn blank_last_line_still_counts_toward_test() -> Result<()> {
    let dir = scratch_dir()?;
    let mut lines: Vec<String> = (0..9).map(|i| format!("l{i}")).collect();
    lines.push("   ".to_string());
    let input = write_corpus(dir.path(), "blank.csv", &lines)?;
    // Index order, so the whitespace-only line is written last.
    let idx = index_lines(&input)?;
    let meta = rewrite_shuffled(&input, &idx, 4, dir.path().join("out/blank_shuffled.csv"))?;
    assert_eq!(meta.line_count, 10);
    assert_eq!(fs::read(&meta.output_path)?.last(), Some(&b'\n'));

    let out = split_file(&meta, &DefaultSplitPolicy, 4)?;
    assert_eq!(out.plan, SplitPlan { train: 7, dev: 0, test: 3 });
    let train = read_lines(&out.train)?;
    let test = read_lines(&out.test)?;
    assert_eq!(train.len(), 7);
    assert_eq!(test, vec!["l7", "l8", ""]);
    assert_eq!(fs::metadata(&out.dev)?.len(), 0);

    let joined: Vec<String> = train.into_iter().chain(test).collect();
    assert_eq!(joined, read_lines(&meta.output_path)?);
    Ok(())
}

#[test]
fn empty_file_gives_three_empty_partitions() -> Result<()> {
    let dir = scratch_dir()?;
    let meta = shuffled(dir.path(), "empty.csv", &[], 10)?;
    assert_eq!(meta.line_count, 0);

    let out = split_file(&meta, &DefaultSplitPolicy, 10)?;
    assert_eq!(out.plan, SplitPlan { train: 0, dev: 0, test: 0 });
    for p in [&out.train, &out.dev, &out.test] {
        assert!(p.is_file());
        assert_eq!(fs::metadata(p)?.len(), 0);
    }
    Ok(())
}

#[test]
fn custom_policy_drives_the_split() -> Result<()> {
    let dir = scratch_dir()?;
    let meta = shuffled(dir.path(), "d.csv", &numbered_lines(500), 50)?;
    let policy = BandOverrides::default().below_thousand(SplitRatios::new(0.5, 0.25, 0.25));

    let out = split_file(&meta, &policy, 50)?;
    assert_eq!(out.plan, SplitPlan { train: 250, dev: 125, test: 125 });
    assert_eq!(read_lines(&out.dev)?.len(), 125);
    Ok(())
}

#[test]
fn missing_shuffled_file_is_an_error() -> Result<()> {
    let dir = scratch_dir()?;
    let meta = RunMetadata {
        byte_size: 0,
        line_count: 10,
        output_path: dir.path().join("gone_shuffled.csv"),
        output_dir: dir.path().to_path_buf(),
        truncated: false,
    };
    assert!(split_file(&meta, &DefaultSplitPolicy, 10).is_err());
    Ok(())
}
