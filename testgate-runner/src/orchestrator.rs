//! Run orchestration -- parallel buckets and the leak check barrier.
//!
//! The [`Orchestrator`] executes an accepted [`Plan`]:
//!
//! 1. Every planned bucket is spawned as an independent task. A semaphore
//!    bounds how many run at once (`runner.max_parallel`).
//! 2. Each bucket ends in exactly one terminal [`BucketOutcome`]. A failing
//!    bucket never cancels its siblings. Exceeding the bucket timeout yields
//!    `TimedOut`; operator cancellation yields `Cancelled`.
//! 3. Once every bucket is terminal, the leak check runs if the plan
//!    schedules it, whatever the bucket outcomes were.
//!
//! # Cancellation
//!
//! A [`CancellationToken`] is shared with every bucket task. Cancelling it
//! (for example from [`cancel_on_signal`]) stops queued and running buckets.
//! The leak check still runs afterwards.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use metrics::{counter, histogram};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use testgate_core::config::TestgateConfig;
use testgate_core::metrics as m;
use testgate_core::types::{BucketOutcome, TriggerEvent, TriggerLevel};
use testgate_leak_check::{CommandStatusClient, LeakChecker, StatusClient};
use testgate_planner::{Plan, PlannedBucket, Planner};

use crate::error::RunnerError;
use crate::executor::{BucketExecutor, PytestExecutor};
use crate::report::{BucketResult, LeakCheckStatus, RunReport};

/// Executes plans: buckets in parallel, then the leak check barrier.
pub struct Orchestrator<E: BucketExecutor, C: StatusClient> {
    executor: Arc<E>,
    leak_checker: LeakChecker<C>,
    leak_check_enabled: bool,
    max_parallel: usize,
    default_timeout_secs: u64,
    cancel: CancellationToken,
}

impl Orchestrator<PytestExecutor, CommandStatusClient> {
    /// Production orchestrator: pytest buckets, command-based status queries.
    pub fn from_config(config: &TestgateConfig) -> Result<Self, RunnerError> {
        let executor = PytestExecutor::from_config(&config.runner)?;
        Self::new(config, Arc::new(executor), Arc::new(CommandStatusClient::new()))
    }
}

impl<E: BucketExecutor, C: StatusClient> Orchestrator<E, C> {
    /// Builds an orchestrator from configuration with explicit seams.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::LeakCheck` if the leak check patterns in the
    /// `[leak_check]` section do not compile.
    pub fn new(
        config: &TestgateConfig,
        executor: Arc<E>,
        status_client: Arc<C>,
    ) -> Result<Self, RunnerError> {
        let leak_checker = LeakChecker::from_config(status_client, &config.leak_check)?;
        Ok(Self {
            executor,
            leak_checker,
            leak_check_enabled: config.leak_check.enabled,
            max_parallel: config.runner.max_parallel.max(1),
            default_timeout_secs: config.runner.default_timeout_secs,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that cancels this orchestrator's buckets.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Plans the trigger and executes the accepted plan.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::Plan` if the partition check rejects the plan.
    /// Nothing is executed in that case.
    pub async fn run(&self, planner: &Planner, trigger: TriggerEvent) -> Result<RunReport, RunnerError> {
        let plan = planner.plan(trigger)?;
        Ok(self.execute(&plan).await)
    }

    /// Executes every bucket of `plan`, then the leak check barrier.
    pub async fn execute(&self, plan: &Plan) -> RunReport {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let level = plan.level();

        tracing::info!(
            run_id = %run_id,
            trigger = %plan.trigger(),
            level = %level,
            buckets = plan.buckets().len(),
            max_parallel = self.max_parallel,
            "run started"
        );

        let buckets = self.execute_buckets(plan.buckets(), level).await;

        // Barrier: every bucket is terminal past this point.
        let leak_check = if !plan.leak_check_scheduled() {
            LeakCheckStatus::NotScheduled
        } else if !self.leak_check_enabled {
            tracing::warn!(run_id = %run_id, "leak check scheduled but disabled by configuration");
            LeakCheckStatus::Disabled
        } else {
            tracing::info!(
                run_id = %run_id,
                targets = plan.leak_check_targets().len(),
                "all buckets terminal, running leak check"
            );
            LeakCheckStatus::Completed(self.leak_checker.check(plan.leak_check_targets()).await)
        };

        let report = RunReport {
            run_id,
            trigger: plan.trigger(),
            level,
            started_at,
            finished_at: Utc::now(),
            buckets,
            leak_check,
        };

        tracing::info!(
            run_id = %report.run_id,
            succeeded = report.count("succeeded"),
            failed = report.count("failed"),
            timed_out = report.count("timed_out"),
            cancelled = report.count("cancelled"),
            leak_check_passed = report.leak_check_passed(),
            "run finished"
        );

        report
    }

    async fn execute_buckets(
        &self,
        planned: &[PlannedBucket],
        level: TriggerLevel,
    ) -> Vec<BucketResult> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut tasks = JoinSet::new();

        for (index, bucket) in planned.iter().cloned().enumerate() {
            let timeout = bucket.bucket.effective_timeout(self.default_timeout_secs);
            let executor = Arc::clone(&self.executor);
            let semaphore = Arc::clone(&semaphore);
            let cancel = self.cancel.clone();
            tasks.spawn(async move {
                let result = run_bucket(executor, bucket, level, timeout, semaphore, cancel).await;
                (index, result)
            });
        }

        let mut results: Vec<Option<BucketResult>> = vec![None; planned.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => tracing::error!(error = %e, "bucket task aborted"),
            }
        }

        results
            .into_iter()
            .zip(planned)
            .map(|(result, planned)| {
                result.unwrap_or_else(|| BucketResult {
                    bucket: planned.bucket.name.clone(),
                    profile: planned.profile.name.clone(),
                    tests: planned.tests.len(),
                    outcome: BucketOutcome::Failed {
                        exit_code: None,
                        reason: "bucket task aborted".to_owned(),
                    },
                    started_at: Utc::now(),
                    duration_secs: 0.0,
                })
            })
            .collect()
    }
}

/// Runs one bucket to a terminal outcome.
async fn run_bucket<E: BucketExecutor>(
    executor: Arc<E>,
    planned: PlannedBucket,
    level: TriggerLevel,
    timeout: Duration,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> BucketResult {
    let permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        permit = semaphore.acquire_owned() => permit.ok(),
    };

    let started_at = Utc::now();
    let start = Instant::now();

    let outcome = match permit {
        None => BucketOutcome::Cancelled,
        Some(_permit) => tokio::select! {
            biased;
            _ = cancel.cancelled() => BucketOutcome::Cancelled,
            result = tokio::time::timeout(timeout, executor.run(&planned, level)) => match result {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => BucketOutcome::Failed {
                    exit_code: None,
                    reason: e.to_string(),
                },
                Err(_elapsed) => BucketOutcome::TimedOut {
                    timeout_secs: timeout.as_secs(),
                },
            },
        },
    };

    let elapsed = start.elapsed();
    counter!(m::BUCKETS_TOTAL, m::LABEL_RESULT => outcome.label()).increment(1);
    histogram!(m::BUCKET_DURATION_SECONDS).record(elapsed.as_secs_f64());

    let name = &planned.bucket.name;
    if outcome.is_success() {
        tracing::info!(bucket = %name, elapsed_secs = elapsed.as_secs(), "bucket succeeded");
    } else {
        tracing::warn!(
            bucket = %name,
            elapsed_secs = elapsed.as_secs(),
            outcome = %outcome,
            "bucket did not succeed"
        );
    }

    BucketResult {
        bucket: name.clone(),
        profile: planned.profile.name.clone(),
        tests: planned.tests.len(),
        outcome,
        started_at,
        duration_secs: elapsed.as_secs_f64(),
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that was received.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
pub async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Spawn a task that cancels `token` on the first shutdown signal.
pub fn cancel_on_signal(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            signal = wait_for_shutdown_signal() => match signal {
                Ok(name) => {
                    tracing::warn!(signal = name, "shutdown signal received, cancelling buckets");
                    token.cancel();
                }
                Err(e) => tracing::error!(error = %e, "signal handling unavailable"),
            },
            _ = token.cancelled() => {}
        }
    })
}
