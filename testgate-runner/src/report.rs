//! Run report types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use testgate_core::types::{BucketOutcome, TriggerEvent, TriggerLevel};
use testgate_leak_check::{LeakReport, LeakVerdict};

/// Terminal result of one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketResult {
    pub bucket: String,
    pub profile: String,
    /// Number of tests the plan routed to this bucket.
    pub tests: usize,
    pub outcome: BucketOutcome,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
}

/// What happened at the leak check barrier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "report", rename_all = "snake_case")]
pub enum LeakCheckStatus {
    /// The gate does not schedule a leak check for this trigger.
    NotScheduled,
    /// Scheduled, but `[leak_check] enabled = false`.
    Disabled,
    Completed(LeakReport),
}

impl LeakCheckStatus {
    pub fn report(&self) -> Option<&LeakReport> {
        match self {
            Self::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Result of a complete run: every bucket plus the leak check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub trigger: TriggerEvent,
    pub level: TriggerLevel,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Bucket results in plan order.
    pub buckets: Vec<BucketResult>,
    pub leak_check: LeakCheckStatus,
}

impl RunReport {
    pub fn failed_buckets(&self) -> Vec<&BucketResult> {
        self.buckets
            .iter()
            .filter(|b| !b.outcome.is_success())
            .collect()
    }

    pub fn all_buckets_succeeded(&self) -> bool {
        self.buckets.iter().all(|b| b.outcome.is_success())
    }

    /// Leak check verdict, if one ran.
    pub fn leak_verdict(&self) -> Option<LeakVerdict> {
        self.leak_check.report().map(LeakReport::verdict)
    }

    /// A leaked or inconclusive leak check fails the run on its own.
    pub fn leak_check_passed(&self) -> bool {
        self.leak_verdict().is_none_or(|v| v.is_clean())
    }

    pub fn is_success(&self) -> bool {
        self.all_buckets_succeeded() && self.leak_check_passed()
    }

    pub fn count(&self, label: &str) -> usize {
        self.buckets
            .iter()
            .filter(|b| b.outcome.label() == label)
            .count()
    }
}
