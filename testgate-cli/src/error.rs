//! CLI-specific error types and exit code mapping

use testgate_core::error::TestgateError;
use testgate_planner::PlannerError;
use testgate_runner::RunnerError;
use testgate_selector::SelectorError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The partition check found orphans, duplicates or empty buckets.
    #[error("plan rejected: {0}")]
    PlanRejected(String),

    /// The leak check found running resources or could not conclude.
    #[error("leak check failed: {0}")]
    Leak(String),

    /// One or more buckets did not succeed.
    #[error("bucket failures: {0}")]
    BucketsFailed(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from testgate-core.
    #[error("{0}")]
    Core(#[from] TestgateError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                          |
    /// |------|----------------------------------|
    /// | 0    | Success                          |
    /// | 1    | General / command error          |
    /// | 2    | Configuration error              |
    /// | 3    | Plan verification failed         |
    /// | 4    | Leak check failed                |
    /// | 5    | One or more buckets failed       |
    /// | 10   | IO error                         |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(TestgateError::Config(_)) => 2,
            Self::PlanRejected(_) => 3,
            Self::Leak(_) => 4,
            Self::BucketsFailed(_) => 5,
            Self::Io(_) | Self::Core(TestgateError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<PlannerError> for CliError {
    fn from(e: PlannerError) -> Self {
        match e {
            PlannerError::PartitionViolated { .. } => Self::PlanRejected(e.to_string()),
            other => Self::Core(other.into()),
        }
    }
}

impl From<SelectorError> for CliError {
    fn from(e: SelectorError) -> Self {
        Self::Command(format!("invalid selector: {e}"))
    }
}

impl From<RunnerError> for CliError {
    fn from(e: RunnerError) -> Self {
        match e {
            RunnerError::Plan(plan) => plan.into(),
            other => Self::Core(other.into()),
        }
    }
}
