//! Poll-until-converged leak check.
//!
//! After an initial grace delay, every pending target is queried once per
//! round. A target converges as soon as a query shows no leaked resources.
//! The interval between rounds doubles up to a cap; after a failed query the
//! next wait jumps straight to the cap. Polling stops when every target has
//! converged or `max_wait` has elapsed, whichever comes first.
//!
//! Targets with the same status command and environment see the same
//! listing, so each round queries it once and shares the result.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use testgate_core::config::LeakCheckConfig;
use testgate_core::metrics as m;
use testgate_core::types::ProvisioningProfile;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::client::StatusClient;
use crate::error::LeakCheckError;
use crate::parser::{Resource, StatusParser};

/// Timing policy for the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Grace period before the first query.
    pub initial_delay: Duration,
    /// Wait after the first round.
    pub poll_interval: Duration,
    /// Upper bound for the doubling interval.
    pub max_poll_interval: Duration,
    /// Total budget measured from the start of the check.
    pub max_wait: Duration,
    /// Per-query timeout.
    pub query_timeout: Duration,
}

impl PollPolicy {
    pub fn from_config(config: &LeakCheckConfig) -> Self {
        Self {
            initial_delay: Duration::from_secs(config.initial_delay_secs),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            max_poll_interval: Duration::from_secs(config.max_poll_interval_secs),
            max_wait: Duration::from_secs(config.max_wait_secs),
            query_timeout: Duration::from_secs(config.query_timeout_secs),
        }
    }

    /// Next interval in the doubling sequence, capped.
    pub fn next_interval(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_poll_interval)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&LeakCheckConfig::default())
    }
}

/// Final state of one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "snake_case")]
pub enum LeakVerdict {
    /// No attributable resource is running.
    Clean,
    /// Resources still running when the budget ran out.
    Leaked(Vec<Resource>),
    /// Every query failed; the state is unknown.
    Inconclusive(String),
}

impl LeakVerdict {
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Leaked(_) => "leaked",
            Self::Inconclusive(_) => "inconclusive",
        }
    }
}

/// Result for one provisioning target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetReport {
    pub profile: String,
    pub target: String,
    pub verdict: LeakVerdict,
    pub queries: u32,
}

/// Result of a complete leak check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeakReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub targets: Vec<TargetReport>,
}

impl LeakReport {
    /// Overall verdict: any leak wins, then any inconclusive target.
    ///
    /// A resource seen by several targets is counted once.
    pub fn verdict(&self) -> LeakVerdict {
        let mut seen = HashSet::new();
        let leaked: Vec<Resource> = self
            .targets
            .iter()
            .filter_map(|t| match &t.verdict {
                LeakVerdict::Leaked(resources) => Some(resources.iter()),
                _ => None,
            })
            .flatten()
            .filter(|r| seen.insert(r.name.as_str()))
            .cloned()
            .collect();
        if !leaked.is_empty() {
            return LeakVerdict::Leaked(leaked);
        }

        let errors: Vec<String> = self
            .targets
            .iter()
            .filter_map(|t| match &t.verdict {
                LeakVerdict::Inconclusive(reason) => Some(format!("{}: {reason}", t.profile)),
                _ => None,
            })
            .collect();
        if !errors.is_empty() {
            return LeakVerdict::Inconclusive(errors.join("; "));
        }

        LeakVerdict::Clean
    }

    pub fn is_clean(&self) -> bool {
        self.verdict().is_clean()
    }

    pub fn leaked_count(&self) -> usize {
        match self.verdict() {
            LeakVerdict::Leaked(resources) => resources.len(),
            _ => 0,
        }
    }
}

/// Per-target polling state.
struct Pending<'a> {
    profile: &'a ProvisioningProfile,
    queries: u32,
    last_leaked: Option<Vec<Resource>>,
    last_error: Option<String>,
    verdict: Option<LeakVerdict>,
}

/// Identity of a status query; equal keys produce the same listing.
#[derive(PartialEq, Eq, Hash)]
struct QueryKey<'a> {
    command: &'a [String],
    env: &'a BTreeMap<String, String>,
    secret_env: &'a [String],
}

impl<'a> QueryKey<'a> {
    fn of(profile: &'a ProvisioningProfile) -> Self {
        Self {
            command: &profile.status_command,
            env: &profile.env,
            secret_env: &profile.secret_env,
        }
    }
}

/// Read-only leak checker over a set of provisioning targets.
pub struct LeakChecker<C: StatusClient> {
    client: Arc<C>,
    parser: StatusParser,
    policy: PollPolicy,
}

impl<C: StatusClient> LeakChecker<C> {
    pub fn new(client: Arc<C>, parser: StatusParser, policy: PollPolicy) -> Self {
        Self {
            client,
            parser,
            policy,
        }
    }

    /// Builds a checker from the `[leak_check]` config section.
    pub fn from_config(client: Arc<C>, config: &LeakCheckConfig) -> Result<Self, LeakCheckError> {
        Ok(Self::new(
            client,
            StatusParser::from_config(config)?,
            PollPolicy::from_config(config),
        ))
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Polls every target until it converges or the budget runs out.
    ///
    /// Never fails: query errors become [`LeakVerdict::Inconclusive`].
    pub async fn check(&self, targets: &[ProvisioningProfile]) -> LeakReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let deadline = start + self.policy.max_wait;

        info!(
            targets = targets.len(),
            initial_delay_secs = self.policy.initial_delay.as_secs(),
            max_wait_secs = self.policy.max_wait.as_secs(),
            "leak check started"
        );

        let mut pending: Vec<Pending<'_>> = targets
            .iter()
            .map(|profile| Pending {
                profile,
                queries: 0,
                last_leaked: None,
                last_error: None,
                verdict: None,
            })
            .collect();

        if !pending.is_empty() {
            tokio::time::sleep(self.policy.initial_delay.min(self.policy.max_wait)).await;
        }

        let mut interval = self.policy.poll_interval;
        let mut round: u32 = 0;

        loop {
            round += 1;
            let mut had_error = false;
            let mut listings: HashMap<QueryKey<'_>, Result<Vec<Resource>, String>> =
                HashMap::new();

            for state in pending.iter_mut().filter(|s| s.verdict.is_none()) {
                state.queries += 1;
                let profile: &ProvisioningProfile = state.profile;
                let result = match listings.get(&QueryKey::of(profile)) {
                    Some(shared) => shared.clone(),
                    None => {
                        let fresh = self.query_once(profile).await.map_err(|e| e.to_string());
                        listings.insert(QueryKey::of(profile), fresh.clone());
                        fresh
                    }
                };
                match result {
                    Ok(leaked) if leaked.is_empty() => {
                        info!(profile = %state.profile.name, round, "target clean");
                        state.verdict = Some(LeakVerdict::Clean);
                    }
                    Ok(leaked) => {
                        info!(
                            profile = %state.profile.name,
                            round,
                            running = leaked.len(),
                            "resources still running"
                        );
                        state.last_leaked = Some(leaked);
                    }
                    Err(e) => {
                        warn!(profile = %state.profile.name, round, error = %e, "status query failed");
                        had_error = true;
                        state.last_error = Some(e);
                    }
                }
            }

            if pending.iter().all(|s| s.verdict.is_some()) {
                break;
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }

            let wait = if had_error {
                self.policy.max_poll_interval
            } else {
                interval
            };
            tokio::time::sleep(wait.min(deadline - now)).await;
            interval = self.policy.next_interval(interval);
        }

        let reports: Vec<TargetReport> = pending
            .into_iter()
            .map(|state| {
                let verdict = match (state.verdict, state.last_leaked, state.last_error) {
                    (Some(verdict), _, _) => verdict,
                    (None, Some(leaked), _) => LeakVerdict::Leaked(leaked),
                    (None, None, Some(error)) => LeakVerdict::Inconclusive(error),
                    (None, None, None) => LeakVerdict::Inconclusive("no query completed".to_owned()),
                };
                TargetReport {
                    profile: state.profile.name.clone(),
                    target: state.profile.target.clone(),
                    verdict,
                    queries: state.queries,
                }
            })
            .collect();

        let report = LeakReport {
            started_at,
            finished_at: Utc::now(),
            targets: reports,
        };

        let elapsed = start.elapsed();
        histogram!(m::LEAK_CHECK_DURATION_SECONDS).record(elapsed.as_secs_f64());
        gauge!(m::LEAKED_RESOURCES).set(report.leaked_count() as f64);

        let verdict = report.verdict();
        match &verdict {
            LeakVerdict::Clean => info!(elapsed_secs = elapsed.as_secs(), "leak check clean"),
            LeakVerdict::Leaked(resources) => warn!(
                elapsed_secs = elapsed.as_secs(),
                leaked = resources.len(),
                "leak check found running resources, manual cleanup required"
            ),
            LeakVerdict::Inconclusive(reason) => warn!(
                elapsed_secs = elapsed.as_secs(),
                reason = %reason,
                "leak check inconclusive"
            ),
        }

        report
    }

    /// One status query with timeout, parsed into leaked resources.
    async fn query_once(
        &self,
        profile: &ProvisioningProfile,
    ) -> Result<Vec<Resource>, LeakCheckError> {
        let result = tokio::time::timeout(self.policy.query_timeout, self.client.query(profile))
            .await
            .unwrap_or_else(|_elapsed| {
                Err(LeakCheckError::Timeout {
                    profile: profile.name.clone(),
                    timeout_secs: self.policy.query_timeout.as_secs(),
                })
            });

        let outcome = if result.is_ok() { "ok" } else { "error" };
        counter!(
            m::LEAK_CHECK_QUERIES_TOTAL,
            m::LABEL_PROFILE => profile.name.clone(),
            m::LABEL_RESULT => outcome
        )
        .increment(1);

        result.map(|listing| self.parser.leaked(&listing))
    }
}
