//! Runner error types.

use testgate_core::error::TestgateError;
use testgate_leak_check::LeakCheckError;
use testgate_planner::PlannerError;

/// Errors raised while planning or launching a run.
///
/// Test failures inside a bucket are not errors; they are reported as
/// [`BucketOutcome`](testgate_core::types::BucketOutcome) values.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// `runner.pytest_command` is empty.
    #[error("test command is empty")]
    EmptyCommand,

    /// The test process could not be started.
    #[error("failed to spawn bucket '{bucket}': {reason}")]
    Spawn { bucket: String, reason: String },

    /// Waiting on the test process failed.
    #[error("failed to wait for bucket '{bucket}': {reason}")]
    Wait { bucket: String, reason: String },

    /// Planning rejected the run.
    #[error(transparent)]
    Plan(#[from] PlannerError),

    /// The leak checker could not be built from configuration.
    #[error(transparent)]
    LeakCheck(#[from] LeakCheckError),
}

impl From<RunnerError> for TestgateError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::Plan(e) => e.into(),
            RunnerError::LeakCheck(e) => e.into(),
            other => TestgateError::Execution(other.to_string()),
        }
    }
}
