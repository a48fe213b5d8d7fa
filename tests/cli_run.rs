// tests/cli_run.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::path::{Path, PathBuf};

use localgrid::cli::CliArgs;
use localgrid::run;

type TestResult = Result<(), Box<dyn Error>>;

const BATCH: &str = r#"
[grid]
slots = 2
termination_backoff_ms = [10, 20]

[job.first]
cmd = "echo one > first.txt"

[job.second]
cmd = "cat first.txt > second.txt"
after = ["first"]
stdout = "logs/second-%J.out"

[job.nested]
cmd = "pwd > where.txt"
cwd = "sub"
threads = 2
"#;

fn write_batch(dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir.join("sub"))?;
    let path = dir.join("batch.toml");
    std::fs::write(&path, BATCH)?;
    Ok(path)
}

fn args(jobs: PathBuf) -> CliArgs {
    CliArgs {
        jobs,
        slots: None,
        log_level: None,
        dry_run: false,
    }
}

#[tokio::test]
async fn runs_batch_relative_to_its_directory() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let batch = write_batch(dir.path())?;

    with_timeout(run(args(batch))).await?;

    assert_eq!(std::fs::read_to_string(dir.path().join("second.txt"))?, "one\n");

    let nested = std::fs::read_to_string(dir.path().join("sub/where.txt"))?;
    assert_eq!(
        Path::new(nested.trim()).canonicalize()?,
        dir.path().join("sub").canonicalize()?
    );

    let logs: Vec<String> = std::fs::read_dir(dir.path().join("logs"))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].starts_with("second-") && logs[0].ends_with(".out"));
    assert!(!logs[0].contains("%J"));
    Ok(())
}

#[tokio::test]
async fn dry_run_executes_nothing() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let batch = write_batch(dir.path())?;

    run(CliArgs {
        dry_run: true,
        ..args(batch)
    })
    .await?;

    assert!(!dir.path().join("first.txt").exists());
    assert!(!dir.path().join("logs").exists());
    Ok(())
}

#[tokio::test]
async fn slot_override_smaller_than_a_job_is_rejected() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let batch = write_batch(dir.path())?;

    let result = run(CliArgs {
        slots: Some(1),
        ..args(batch)
    })
    .await;

    let err = result.expect_err("job with two threads cannot fit one slot");
    assert!(format!("{err:#}").contains("nested"));
    assert!(!dir.path().join("first.txt").exists());
    Ok(())
}

#[tokio::test]
async fn invalid_batch_fails_before_running_anything() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cycle.toml");
    std::fs::write(
        &path,
        "[job.a]\ncmd = \"touch a\"\nafter = [\"b\"]\n\n[job.b]\ncmd = \"touch b\"\nafter = [\"a\"]\n",
    )?;

    assert!(run(args(path)).await.is_err());
    assert!(!dir.path().join("a").exists());
    Ok(())
}
