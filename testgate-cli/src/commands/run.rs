//! `testgate run` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use testgate_core::types::BucketOutcome;
use testgate_leak_check::LeakVerdict;
use testgate_planner::Planner;
use testgate_runner::{LeakCheckStatus, Orchestrator, RunReport, cancel_on_signal};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `run` command.
///
/// The report is rendered before the exit status is decided, so a failing
/// run still prints every bucket. A leak outranks bucket failures.
pub async fn execute(
    args: RunArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let trigger = super::parse_trigger(&args.trigger)?;
    let config = super::load_config(config_path).await?;
    testgate_core::metrics::describe_metrics();

    let planner = Planner::from_config(&config).await?;
    let orchestrator = Orchestrator::from_config(&config)?;
    let signals = cancel_on_signal(orchestrator.cancellation_token());

    info!(trigger = %trigger, "starting run");
    let result = orchestrator.run(&planner, trigger).await;
    signals.abort();
    let report = result?;

    writer.render(&RunOutput(&report))?;
    check_report(&report)
}

fn check_report(report: &RunReport) -> Result<(), CliError> {
    match report.leak_verdict() {
        Some(LeakVerdict::Leaked(resources)) => {
            return Err(CliError::Leak(format!(
                "{} resources still running",
                resources.len()
            )));
        }
        Some(LeakVerdict::Inconclusive(reason)) => {
            return Err(CliError::Leak(format!("inconclusive: {reason}")));
        }
        Some(LeakVerdict::Clean) | None => {}
    }

    let failed = report.failed_buckets();
    if !failed.is_empty() {
        let names: Vec<&str> = failed.iter().map(|b| b.bucket.as_str()).collect();
        return Err(CliError::BucketsFailed(format!(
            "{} of {}: {}",
            failed.len(),
            report.buckets.len(),
            names.join(", ")
        )));
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(transparent)]
struct RunOutput<'a>(&'a RunReport);

impl Render for RunOutput<'_> {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let report = self.0;
        writeln!(
            w,
            "Run {} ({}, level {})",
            report.run_id.bold(),
            report.trigger,
            report.level
        )?;
        writeln!(w)?;

        for bucket in &report.buckets {
            let label = match &bucket.outcome {
                BucketOutcome::Succeeded => "PASS".green().bold(),
                BucketOutcome::Failed { .. } => "FAIL".red().bold(),
                BucketOutcome::TimedOut { .. } => "TIMEOUT".red().bold(),
                BucketOutcome::Cancelled => "CANCELLED".yellow().bold(),
            };
            writeln!(
                w,
                "  {:<10} {:<32} {:>5} tests  {:>8.1}s",
                label, bucket.bucket, bucket.tests, bucket.duration_secs
            )?;
            if !bucket.outcome.is_success() {
                writeln!(w, "             {}", bucket.outcome.to_string().dimmed())?;
            }
        }

        writeln!(w)?;
        match &report.leak_check {
            LeakCheckStatus::NotScheduled => writeln!(w, "Leak check: not scheduled")?,
            LeakCheckStatus::Disabled => {
                writeln!(w, "Leak check: {}", "disabled".yellow())?;
            }
            LeakCheckStatus::Completed(leak) => super::leak_check::render_leak_report(leak, w)?,
        }

        writeln!(w)?;
        writeln!(
            w,
            "{} succeeded, {} failed, {} timed out, {} cancelled",
            report.count("succeeded"),
            report.count("failed"),
            report.count("timed_out"),
            report.count("cancelled")
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use testgate_core::types::{TriggerEvent, TriggerLevel};
    use testgate_leak_check::{LeakReport, Resource, TargetReport};
    use testgate_runner::BucketResult;

    fn bucket(name: &str, outcome: BucketOutcome) -> BucketResult {
        BucketResult {
            bucket: name.to_owned(),
            profile: "aws".to_owned(),
            tests: 2,
            outcome,
            started_at: Utc::now(),
            duration_secs: 12.0,
        }
    }

    fn report(buckets: Vec<BucketResult>, leak_check: LeakCheckStatus) -> RunReport {
        RunReport {
            run_id: "run-1".to_owned(),
            trigger: TriggerEvent::Schedule,
            level: TriggerLevel::Release,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            buckets,
            leak_check,
        }
    }

    fn leaked() -> LeakCheckStatus {
        LeakCheckStatus::Completed(LeakReport {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            targets: vec![TargetReport {
                profile: "aws".to_owned(),
                target: "ci".to_owned(),
                verdict: LeakVerdict::Leaked(vec![Resource {
                    name: "ci-aws-1".to_owned(),
                    status: "UP".to_owned(),
                }]),
                queries: 4,
            }],
        })
    }

    #[test]
    fn clean_run_passes() {
        let report = report(
            vec![bucket("cluster-tests", BucketOutcome::Succeeded)],
            LeakCheckStatus::NotScheduled,
        );
        assert!(check_report(&report).is_ok());
    }

    #[test]
    fn leak_outranks_bucket_failure() {
        let report = report(
            vec![bucket(
                "cluster-tests",
                BucketOutcome::Failed {
                    exit_code: Some(1),
                    reason: "1 failed".to_owned(),
                },
            )],
            leaked(),
        );
        assert_eq!(check_report(&report).unwrap_err().exit_code(), 4);
    }

    #[test]
    fn failed_buckets_are_named() {
        let report = report(
            vec![
                bucket("cluster-tests", BucketOutcome::Succeeded),
                bucket("kubernetes-tests", BucketOutcome::TimedOut { timeout_secs: 7200 }),
            ],
            LeakCheckStatus::Disabled,
        );
        let err = check_report(&report).unwrap_err();
        assert_eq!(err.exit_code(), 5);
        assert!(err.to_string().contains("1 of 2: kubernetes-tests"));
    }

    #[test]
    fn text_output_shows_outcomes_and_leaks() {
        colored::control::set_override(false);
        let report = report(
            vec![
                bucket("cluster-tests", BucketOutcome::Succeeded),
                bucket("kubernetes-tests", BucketOutcome::Cancelled),
            ],
            leaked(),
        );

        let mut buffer = Vec::new();
        RunOutput(&report).render_text(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("PASS"));
        assert!(text.contains("CANCELLED"));
        assert!(text.contains("- ci-aws-1 [UP]"));
        assert!(text.contains("1 succeeded, 0 failed, 0 timed out, 1 cancelled"));
    }
}
