//! testgate-leak-check -- post-run resource leak tripwire
//!
//! Runs after every bucket has reached a terminal state. Queries each cloud
//! provisioning target with its read-only status command and reports any
//! CI-owned resource that is still running. It never cleans anything up.
//!
//! # Module layout
//!
//! - [`client`]: [`StatusClient`] trait and the child-process implementation
//! - [`parser`]: status listing parser and leak attribution
//! - [`poller`]: poll-with-backoff loop and reports
//! - [`redact`]: credential masking for output and errors

pub mod client;
pub mod error;
pub mod parser;
pub mod poller;
pub mod redact;

pub use client::{CommandStatusClient, StatusClient};
pub use error::LeakCheckError;
pub use parser::{Resource, StatusParser};
pub use poller::{LeakChecker, LeakReport, LeakVerdict, PollPolicy, TargetReport};
