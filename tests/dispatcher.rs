use anyhow::Result;
use chrono::NaiveDate;
use ironsplit::testing::*;
use ironsplit::*;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
}

fn config(input: &Path, output: &Path) -> PrepConfig {
    PrepConfig::new(input, ["csv"])
        .output_root(output)
        .batch_size(64)
        .shuffle_repeats(2)
        .seed(11)
}

#[test]
fn job_processes_every_matching_file() -> Result<()> {
    let input = scratch_dir()?;
    let output = scratch_dir()?;
    write_corpus(input.path(), "small.csv", &numbered_lines(100))?;
    write_corpus(input.path(), "medium.csv", &numbered_lines(2_500))?;
    write_corpus(input.path(), "notes.txt", &numbered_lines(5))?;

    let report = Dispatcher::new(config(input.path(), output.path()))?.run_on(run_date())?;
    assert_eq!(report.outcomes.len(), 2);
    assert!(report.is_success());
    assert_eq!(report.succeeded(), 2);

    let out_dir = output.path().join("processed_data_2024-05-17");
    let small = report
        .outcome(input.path().join("small.csv"))
        .and_then(FileOutcome::splits)
        .unwrap();
    assert_eq!(small.plan, SplitPlan { train: 70, dev: 0, test: 30 });
    let medium = report
        .outcome(input.path().join("medium.csv"))
        .and_then(FileOutcome::splits)
        .unwrap();
    assert_eq!(medium.plan, SplitPlan { train: 1_500, dev: 500, test: 500 });

    for name in [
        "small_shuffled.csv",
        "small_train.csv",
        "small_dev.csv",
        "small_test.csv",
        "medium_shuffled.csv",
        "medium_train.csv",
        "medium_dev.csv",
        "medium_test.csv",
    ] {
        assert!(out_dir.join(name).is_file(), "missing {name}");
    }
    assert!(!out_dir.join("notes_shuffled.txt").exists());

    assert_same_multiset(
        &read_lines(out_dir.join("medium_shuffled.csv"))?,
        &numbered_lines(2_500),
    );
    Ok(())
}

#[test]
fn split_can_be_disabled() -> Result<()> {
    let input = scratch_dir()?;
    let output = scratch_dir()?;
    write_corpus(input.path(), "a.csv", &numbered_lines(20))?;

    let cfg = config(input.path(), output.path()).split(false);
    let report = Dispatcher::new(cfg)?.run_on(run_date())?;
    let outcome = &report.outcomes[0];
    assert!(outcome.is_success());
    assert!(outcome.splits().is_none());
    assert_eq!(outcome.metadata().map(|m| m.line_count), Some(20));

    let out_dir = output.path().join("processed_data_2024-05-17");
    assert!(out_dir.join("a_shuffled.csv").is_file());
    assert!(!out_dir.join("a_train.csv").exists());
    Ok(())
}

#[test]
fn fixed_seed_reproduces_the_shuffle() -> Result<()> {
    let input = scratch_dir()?;
    write_corpus(input.path(), "a.csv", &numbered_lines(300))?;

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let output = scratch_dir()?;
        Dispatcher::new(config(input.path(), output.path()))?.run_on(run_date())?;
        outputs.push(fs::read(
            output.path().join("processed_data_2024-05-17/a_shuffled.csv"),
        )?);
    }
    assert_eq!(outputs[0], outputs[1]);
    Ok(())
}

#[test]
fn one_failing_file_does_not_stop_the_others() -> Result<()> {
    let input = scratch_dir()?;
    let output = scratch_dir()?;
    for name in ["good.csv", "bad_rewrite.csv", "bad_split.csv"] {
        write_corpus(input.path(), name, &numbered_lines(40))?;
    }
    // Directories squatting on output paths make those writes fail.
    let out_dir = output.path().join("processed_data_2024-05-17");
    fs::create_dir_all(out_dir.join("bad_rewrite_shuffled.csv"))?;
    fs::create_dir_all(out_dir.join("bad_split_dev.csv"))?;

    let report = Dispatcher::new(config(input.path(), output.path()))?.run_on(run_date())?;
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.succeeded(), 1);
    assert!(!report.is_success());

    let status = |name: &str| report.outcome(input.path().join(name)).map(|o| o.status.clone());
    assert!(matches!(status("good.csv"), Some(FileStatus::Completed { splits: Some(_), .. })));
    assert!(matches!(
        status("bad_rewrite.csv"),
        Some(FileStatus::Failed { stage: Stage::Rewrite, .. })
    ));
    assert!(matches!(
        status("bad_split.csv"),
        Some(FileStatus::Failed { stage: Stage::Split, .. })
    ));
    assert_eq!(report.failures().count(), 2);
    Ok(())
}

#[test]
fn sequential_and_parallel_agree() -> Result<()> {
    let input = scratch_dir()?;
    for i in 0..6 {
        write_corpus(input.path(), &format!("f{i}.csv"), &numbered_lines(50 + i * 10))?;
    }

    let seq_out = scratch_dir()?;
    let par_out = scratch_dir()?;
    let seq = Dispatcher::new(config(input.path(), seq_out.path()).mode(ExecMode::Sequential))?
        .run_on(run_date())?;
    let par = Dispatcher::new(
        config(input.path(), par_out.path()).mode(ExecMode::Parallel { threads: Some(3) }),
    )?
    .run_on(run_date())?;

    let inputs = |r: &JobReport| r.outcomes.iter().map(|o| o.input.clone()).collect::<Vec<_>>();
    assert_eq!(inputs(&seq), inputs(&par));
    for i in 0..6 {
        let name = format!("processed_data_2024-05-17/f{i}_shuffled.csv");
        assert_eq!(fs::read(seq_out.path().join(&name))?, fs::read(par_out.path().join(&name))?);
    }
    Ok(())
}

/// Records the name of the thread each file is split on.
#[derive(Default)]
struct ThreadNames(Mutex<Vec<String>>);

impl SplitPolicy for ThreadNames {
    fn below_thousand(&self) -> SplitRatios {
        let name = std::thread::current().name().unwrap_or("").to_string();
        self.0.lock().unwrap().push(name);
        SplitRatios::SMALL
    }
}

#[test]
fn parallel_mode_uses_the_worker_pool_when_enabled() -> Result<()> {
    let input = scratch_dir()?;
    let output = scratch_dir()?;
    for i in 0..4 {
        write_corpus(input.path(), &format!("t{i}.csv"), &numbered_lines(20))?;
    }

    let names = Arc::new(ThreadNames::default());
    let cfg = config(input.path(), output.path()).mode(ExecMode::Parallel { threads: Some(2) });
    let report = Dispatcher::new(cfg)?
        .with_policy(names.clone())
        .run_on(run_date())?;
    assert_eq!(report.succeeded(), 4);

    let names = names.0.lock().unwrap();
    assert_eq!(names.len(), 4);
    let on_pool = names.iter().all(|n| n.starts_with("ironsplit-worker-"));
    assert_eq!(on_pool, cfg!(feature = "parallel-io"), "{names:?}");
    Ok(())
}

#[test]
fn custom_policy_applies_to_every_file() -> Result<()> {
    let input = scratch_dir()?;
    let output = scratch_dir()?;
    write_corpus(input.path(), "a.csv", &numbered_lines(500))?;
    write_corpus(input.path(), "b.csv", &numbered_lines(50_000))?;

    let policy = BandOverrides::default().below_thousand(SplitRatios::new(0.5, 0.25, 0.25));
    let report = Dispatcher::new(config(input.path(), output.path()).batch_size(5_000))?
        .with_policy(Arc::new(policy))
        .run_on(run_date())?;

    let plan = |name: &str| {
        report
            .outcome(input.path().join(name))
            .and_then(FileOutcome::splits)
            .map(|s| s.plan)
    };
    assert_eq!(plan("a.csv"), Some(SplitPlan { train: 250, dev: 125, test: 125 }));
    assert_eq!(
        plan("b.csv"),
        Some(SplitPlan { train: 30_000, dev: 10_000, test: 10_000 })
    );
    Ok(())
}

#[test]
fn empty_directory_completes_with_no_outcomes() -> Result<()> {
    let input = scratch_dir()?;
    let output = scratch_dir()?;
    let report = Dispatcher::new(config(input.path(), output.path()))?.run_on(run_date())?;
    assert!(report.outcomes.is_empty());
    assert!(report.is_success());
    Ok(())
}

#[test]
fn empty_input_file_completes() -> Result<()> {
    let input = scratch_dir()?;
    let output = scratch_dir()?;
    fs::write(input.path().join("empty.csv"), "")?;

    let report = Dispatcher::new(config(input.path(), output.path()))?.run_on(run_date())?;
    let outcome = &report.outcomes[0];
    assert!(outcome.is_success());
    assert_eq!(outcome.metadata().map(|m| m.line_count), Some(0));
    assert_eq!(
        outcome.splits().map(|s| s.plan),
        Some(SplitPlan { train: 0, dev: 0, test: 0 })
    );
    Ok(())
}
