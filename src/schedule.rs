//! Fixed-interval ingestion loop.
//!
//! Each tick runs the beer ingestion and, only when it succeeded, the
//! downstream transform command (for example `dbt run`). A failed tick is
//! logged and the loop waits for the next one.

use std::time::Duration;

use reqwest::Client;
use tokio::process::Command;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, instrument, warn};

use crate::config::AppConfig;
use crate::error::{PipelineError, Result};
use crate::pipelines::ingest_beers;
use crate::shutdown::Shutdown;

/// Options for [`run_schedule`].
#[derive(Debug, Clone)]
pub struct ScheduleOptions {
    pub every: Duration,
    /// Shell-style command line, split on whitespace.
    pub transform_cmd: Option<String>,
    /// Run a single tick and return its outcome.
    pub once: bool,
    pub per_page: u32,
}

/// Split a command line into program and arguments.
pub fn split_command(line: &str) -> Result<(String, Vec<String>)> {
    let mut parts = line.split_whitespace().map(str::to_string);
    let program = parts
        .next()
        .ok_or_else(|| PipelineError::invalid("Transform command is empty"))?;
    Ok((program, parts.collect()))
}

/// Run the transform command, failing on a non-zero exit.
#[instrument(level = "info")]
pub async fn run_transform(line: &str) -> Result<()> {
    let (program, args) = split_command(line)?;
    let status = Command::new(&program).args(&args).status().await?;
    if !status.success() {
        error!(%program, code = ?status.code(), "Transform command failed");
        return Err(PipelineError::invalid(format!(
            "transform command '{line}' exited with {status}"
        )));
    }
    info!(%program, "Transform command finished");
    Ok(())
}

/// One ingestion followed by the transform, if configured.
async fn tick(config: &AppConfig, client: &Client, options: &ScheduleOptions) -> Result<()> {
    ingest_beers(config, client, options.per_page).await?;
    match &options.transform_cmd {
        Some(cmd) => run_transform(cmd).await,
        None => Ok(()),
    }
}

/// Run ticks every `options.every` until interrupted, or once with
/// `options.once`.
///
/// An interrupt during a tick abandons that tick; the transform does not
/// run for it.
///
/// # Errors
///
/// With `once`, the tick's own error. Otherwise the loop only ends on an
/// interrupt and returns `Ok`.
#[instrument(level = "info", skip_all, fields(every_secs = options.every.as_secs(), once = options.once))]
pub async fn run_schedule(
    config: &AppConfig,
    client: &Client,
    options: &ScheduleOptions,
    mut shutdown: Shutdown,
) -> Result<()> {
    let mut interval = time::interval(options.every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = shutdown.requested() => {
                info!("Schedule stopped");
                return Ok(());
            }
            _ = interval.tick() => {}
        }
        let outcome = tokio::select! {
            biased;
            _ = shutdown.requested() => {
                warn!("Interrupted during a scheduled run");
                return Ok(());
            }
            outcome = tick(config, client, options) => outcome,
        };
        if options.once {
            return outcome;
        }
        match outcome {
            Ok(()) => info!("Scheduled run succeeded"),
            Err(e) => warn!(error = %e, "Scheduled run failed; transform skipped"),
        }
    }
}
