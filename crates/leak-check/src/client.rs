//! Infrastructure status query abstraction.
//!
//! The [`StatusClient`] trait is the single seam between the leak check and
//! live infrastructure. Production code uses [`CommandStatusClient`], which
//! runs the profile's read-only status command; tests use `MockStatusClient`.
//!
//! ```text
//!   LeakChecker
//!        │
//!        ▼
//!  StatusClient (trait)
//!     │       │
//!     ▼       ▼
//!  Command   Mock
//!     │
//!     ▼
//!  `sky status --refresh`
//! ```

use std::future::Future;
use std::process::Stdio;

use testgate_core::types::ProvisioningProfile;
use tokio::process::Command;

use crate::error::LeakCheckError;
use crate::redact::{redact_values, secret_values};

/// Maximum bytes of stderr carried into an error message.
const MAX_STDERR_BYTES: usize = 2048;

/// Trait abstracting the read-only infrastructure status query.
///
/// Implementations must not mutate infrastructure. The returned text is the
/// raw status listing, parsed later by [`StatusParser`](crate::StatusParser).
pub trait StatusClient: Send + Sync + 'static {
    /// Queries the current resource listing for one provisioning target.
    ///
    /// # Errors
    ///
    /// - `LeakCheckError::NoStatusCommand`: the profile has no status command
    /// - `LeakCheckError::Spawn`: the command could not be started
    /// - `LeakCheckError::Query`: the command exited unsuccessfully
    fn query(
        &self,
        profile: &ProvisioningProfile,
    ) -> impl Future<Output = Result<String, LeakCheckError>> + Send;
}

/// Runs `profile.status_command` as a child process.
///
/// The profile's secret environment variables are forwarded from the current
/// process environment, and its non-secret `env` entries are set verbatim.
/// The child is killed if the query future is dropped (e.g. on timeout).
#[derive(Debug, Clone, Default)]
pub struct CommandStatusClient;

impl CommandStatusClient {
    pub fn new() -> Self {
        Self
    }
}

impl StatusClient for CommandStatusClient {
    async fn query(&self, profile: &ProvisioningProfile) -> Result<String, LeakCheckError> {
        let Some((program, args)) = profile.status_command.split_first() else {
            return Err(LeakCheckError::NoStatusCommand(profile.name.clone()));
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(&profile.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for name in &profile.secret_env {
            match std::env::var(name) {
                Ok(value) => {
                    command.env(name, value);
                }
                Err(_) => {
                    tracing::warn!(
                        profile = %profile.name,
                        variable = %name,
                        "secret environment variable not set"
                    );
                }
            }
        }

        tracing::debug!(
            profile = %profile.name,
            command = %profile.status_command.join(" "),
            "running status query"
        );

        let output = command
            .output()
            .await
            .map_err(|e| LeakCheckError::Spawn {
                profile: profile.name.clone(),
                reason: e.to_string(),
            })?;

        let secrets = secret_values(profile);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = truncate(stderr.trim(), MAX_STDERR_BYTES);
            return Err(LeakCheckError::Query {
                profile: profile.name.clone(),
                reason: redact_values(
                    &format!("{}: {stderr}", output.status),
                    &secrets,
                ),
            });
        }

        Ok(redact_values(
            &String::from_utf8_lossy(&output.stdout),
            &secrets,
        ))
    }
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Scripted status client for tests.
///
/// Responses are served per profile in order; the last response repeats once
/// the script is exhausted.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockStatusClient {
    scripts: std::sync::Mutex<
        std::collections::HashMap<String, std::collections::VecDeque<Result<String, String>>>,
    >,
    calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockStatusClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a successful listing for a profile.
    pub fn respond(self, profile: &str, listing: &str) -> Self {
        self.push(profile, Ok(listing.to_owned()));
        self
    }

    /// Appends a failing query for a profile.
    pub fn fail(self, profile: &str, reason: &str) -> Self {
        self.push(profile, Err(reason.to_owned()));
        self
    }

    fn push(&self, profile: &str, response: Result<String, String>) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts
                .entry(profile.to_owned())
                .or_default()
                .push_back(response);
        }
    }

    /// Number of queries issued for a profile.
    pub fn calls(&self, profile: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.iter().filter(|c| *c == profile).count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
impl StatusClient for MockStatusClient {
    async fn query(&self, profile: &ProvisioningProfile) -> Result<String, LeakCheckError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(profile.name.clone());
        }

        let response = {
            let mut scripts = self.scripts.lock().map_err(|_| LeakCheckError::Query {
                profile: profile.name.clone(),
                reason: "mock poisoned".to_owned(),
            })?;
            let queue = scripts.entry(profile.name.clone()).or_default();
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        };

        match response {
            Some(Ok(listing)) => Ok(listing),
            Some(Err(reason)) => Err(LeakCheckError::Query {
                profile: profile.name.clone(),
                reason,
            }),
            None => Ok(String::new()),
        }
    }
}
