//! testgate runner library.
//!
//! Executes an accepted plan: buckets in parallel under a concurrency limit,
//! each with a hard timeout, followed by the always-run leak check barrier.
//! The `testgate-runner` binary and the `testgate run` subcommand both drive
//! this library.

pub mod error;
pub mod executor;
pub mod logging;
pub mod orchestrator;
pub mod report;

pub use error::RunnerError;
pub use executor::{BucketExecutor, PytestExecutor};
pub use orchestrator::{Orchestrator, cancel_on_signal, wait_for_shutdown_signal};
pub use report::{BucketResult, LeakCheckStatus, RunReport};
