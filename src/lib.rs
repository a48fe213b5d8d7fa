// src/lib.rs

pub mod cli;
pub mod cluster;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::cluster::{Job, LocalCluster};
use crate::config::{BatchFile, JobConfig, dependency_order, ensure_jobs_fit, load_and_validate};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - batch file loading and validation
/// - the local cluster (master + executors)
/// - submission in dependency order
/// - Ctrl-C / SIGTERM handling
pub async fn run(args: CliArgs) -> Result<()> {
    let mut batch = load_and_validate(&args.jobs)?;

    if let Some(slots) = args.slots {
        batch.grid.slots = slots;
    }
    let slots = batch.grid.resolved_slots();
    ensure_jobs_fit(&batch.job, slots)?;

    let base_dir = batch_root_dir(&args.jobs);
    if let Some(log_dir) = batch.grid.log_dir.take() {
        batch.grid.log_dir = Some(resolve_against(&base_dir, &log_dir));
    }

    if args.dry_run {
        print_dry_run(&batch, slots)?;
        return Ok(());
    }

    let mut cluster = LocalCluster::new(batch.grid.clone());
    cluster.start();

    let submitted = submit_batch(&cluster, &batch, &base_dir).await?;
    info!(count = submitted.len(), "batch submitted; waiting for jobs");

    tokio::select! {
        res = cluster.wait() => {
            res?;
            info!("all jobs finished");
            Ok(())
        }
        signal = shutdown_signal() => {
            if let Err(e) = signal {
                warn!(error = %e, "failed to listen for shutdown signals; shutting down");
            } else {
                warn!("interrupted; terminating running jobs");
            }
            cluster.shutdown().await?;
            Err(anyhow!("interrupted"))
        }
    }
}

/// Resolves on Ctrl-C, or on SIGTERM on unix.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res,
            _ = term.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

/// Submit every job of `batch` so that dependencies always go first, and
/// print `name<TAB>id` for each one.
pub async fn submit_batch(
    cluster: &LocalCluster,
    batch: &BatchFile,
    base_dir: &Path,
) -> Result<HashMap<String, Job>> {
    let mut submitted: HashMap<String, Job> = HashMap::with_capacity(batch.job.len());

    for name in dependency_order(&batch.job)? {
        let Some(config) = batch.job.get(name) else {
            continue;
        };

        let mut job = job_from_config(config, base_dir);
        for dep in &config.after {
            let parent = submitted
                .get(dep)
                .ok_or_else(|| anyhow!("job '{name}' submitted before its dependency '{dep}'"))?;
            job = job.after(parent);
        }

        let job = cluster.submit(job).await?;
        if let Some(id) = job.id {
            println!("{name}\t{id}");
        }
        submitted.insert(name.to_string(), job);
    }

    Ok(submitted)
}

/// Turn a `[job.<name>]` section into a cluster job.
///
/// Relative `cwd` is taken from the batch file's directory; relative log
/// templates from the job's working directory.
fn job_from_config(config: &JobConfig, base_dir: &Path) -> Job {
    let cwd = match &config.cwd {
        Some(cwd) => resolve_against(base_dir, cwd),
        None => base_dir.to_path_buf(),
    };

    let mut job = Job::new(config.cmd.clone()).threads(config.threads);
    if let Some(stdout) = &config.stdout {
        job = job.stdout(resolve_template(&cwd, stdout));
    }
    if let Some(stderr) = &config.stderr {
        job = job.stderr(resolve_template(&cwd, stderr));
    }
    job.in_dir(cwd)
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn resolve_template(base: &Path, template: &str) -> String {
    resolve_against(base, Path::new(template))
        .to_string_lossy()
        .into_owned()
}

/// Directory relative paths in a batch file are resolved against.
///
/// - If the batch path has a non-empty parent (e.g. "batches/align.toml"),
///   we use that directory.
/// - If it's just a bare filename like "localgrid.toml" (parent = ""),
///   we fall back to the current working directory.
fn batch_root_dir(batch_path: &Path) -> PathBuf {
    let dir = match batch_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if dir.is_absolute() {
        return dir;
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&dir))
        .unwrap_or(dir)
}

/// Simple dry-run output: print grid settings and jobs in submission order.
fn print_dry_run(batch: &BatchFile, slots: usize) -> Result<()> {
    println!("localgrid dry-run");
    println!("  grid.slots = {slots}");
    if let Some(ref log_dir) = batch.grid.log_dir {
        println!("  grid.log_dir = {}", log_dir.display());
    }
    println!();

    let order = dependency_order(&batch.job)?;
    println!("jobs ({}), in submission order:", order.len());
    for name in order {
        let Some(job) = batch.job.get(name) else {
            continue;
        };
        println!("  - {name}");
        println!("      cmd: {}", job.cmd);
        println!("      threads: {}", job.threads);
        if let Some(ref cwd) = job.cwd {
            println!("      cwd: {}", cwd.display());
        }
        if !job.after.is_empty() {
            println!("      after: {:?}", job.after);
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
