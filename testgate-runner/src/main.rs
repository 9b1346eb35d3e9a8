//! testgate-runner -- CI entry point.
//!
//! Exit codes: 0 success, 1 error, 3 plan rejected, 4 leak check failed,
//! 5 one or more buckets did not succeed.

mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use testgate_core::config::TestgateConfig;
use testgate_core::types::TriggerEvent;
use testgate_planner::Planner;
use testgate_runner::logging::init_tracing;
use testgate_runner::{Orchestrator, RunnerError, cancel_on_signal};

use cli::RunnerCli;

const EXIT_PLAN_REJECTED: u8 = 3;
const EXIT_LEAK_CHECK_FAILED: u8 = 4;
const EXIT_BUCKETS_FAILED: u8 = 5;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = RunnerCli::parse();

    let mut config = TestgateConfig::load(&cli.config)
        .await
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;

    // CLI flags take precedence over file and environment
    cli.apply_overrides(&mut config)
        .context("invalid command-line override")?;

    init_tracing(&config.general)?;
    testgate_core::metrics::describe_metrics();

    let trigger: TriggerEvent = cli.trigger.parse()?;
    tracing::info!(config = %cli.config.display(), trigger = %trigger, "testgate-runner starting");

    let planner = Planner::from_config(&config).await?;

    if cli.dry_run {
        return match planner.plan(trigger) {
            Ok(plan) => {
                println!("{}", serde_json::to_string_pretty(&plan.redacted())?);
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                tracing::error!(error = %e, "plan rejected");
                Ok(ExitCode::from(EXIT_PLAN_REJECTED))
            }
        };
    }

    let orchestrator = Orchestrator::from_config(&config)?;
    let signals = cancel_on_signal(orchestrator.cancellation_token());

    let report = match orchestrator.run(&planner, trigger).await {
        Ok(report) => report,
        Err(RunnerError::Plan(e)) => {
            tracing::error!(error = %e, "plan rejected");
            signals.abort();
            return Ok(ExitCode::from(EXIT_PLAN_REJECTED));
        }
        Err(e) => return Err(e.into()),
    };
    signals.abort();

    println!("{}", serde_json::to_string_pretty(&report)?);

    let code = if !report.leak_check_passed() {
        EXIT_LEAK_CHECK_FAILED
    } else if !report.all_buckets_succeeded() {
        EXIT_BUCKETS_FAILED
    } else {
        0
    };
    Ok(ExitCode::from(code))
}
