//! Bucket execution.
//!
//! The [`BucketExecutor`] trait is the seam between the orchestrator and the
//! external test runner. [`PytestExecutor`] launches one pytest process per
//! bucket:
//!
//! ```text
//! pytest -v --level <local|release> [-m "<marker>"] [-k "<keyword>"] <test path>
//! ```
//!
//! A `*` selector has no pytest spelling, so its flag is left out and pytest
//! collects everything. Output is streamed line by line through `tracing`.
//!
//! Timeouts and cancellation are enforced by the orchestrator, which drops
//! the execution future; the child process is killed on drop.

use std::collections::VecDeque;
use std::future::Future;
use std::process::Stdio;

use testgate_core::config::RunnerConfig;
use testgate_core::types::{BucketOutcome, ProvisioningProfile, TriggerLevel};
use testgate_leak_check::redact::redact;
use testgate_planner::PlannedBucket;
use testgate_selector::Selector;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::error::RunnerError;

/// Lines of captured output kept in a failure reason.
const FAILURE_TAIL_LINES: usize = 20;

/// Runs one planned bucket to completion.
///
/// Implementations report test failures as [`BucketOutcome::Failed`] and
/// reserve `Err` for failures to launch or supervise the runner itself.
pub trait BucketExecutor: Send + Sync + 'static {
    fn run(
        &self,
        planned: &PlannedBucket,
        level: TriggerLevel,
    ) -> impl Future<Output = Result<BucketOutcome, RunnerError>> + Send;
}

/// Launches the configured pytest command for a bucket.
///
/// The bucket's profile supplies the environment: non-secret `env` entries
/// are set verbatim and every `secret_env` name is forwarded from the
/// current process environment. Captured output is redacted before it is
/// logged or carried into a failure reason.
#[derive(Debug, Clone)]
pub struct PytestExecutor {
    command: Vec<String>,
    test_path: String,
}

impl PytestExecutor {
    pub fn new(command: Vec<String>, test_path: impl Into<String>) -> Result<Self, RunnerError> {
        if command.is_empty() {
            return Err(RunnerError::EmptyCommand);
        }
        Ok(Self {
            command,
            test_path: test_path.into(),
        })
    }

    pub fn from_config(config: &RunnerConfig) -> Result<Self, RunnerError> {
        Self::new(config.pytest_command.clone(), config.test_path.clone())
    }

    /// Full argv for a bucket, program first.
    pub fn build_args(&self, planned: &PlannedBucket, level: TriggerLevel) -> Vec<String> {
        let mut args = self.command.clone();
        args.push("--level".to_owned());
        args.push(level.as_str().to_owned());
        push_selector(&mut args, "-m", Some(&planned.bucket.marker));
        push_selector(&mut args, "-k", planned.bucket.keyword.as_ref());
        if !self.test_path.is_empty() {
            args.push(self.test_path.clone());
        }
        args
    }
}

impl BucketExecutor for PytestExecutor {
    async fn run(
        &self,
        planned: &PlannedBucket,
        level: TriggerLevel,
    ) -> Result<BucketOutcome, RunnerError> {
        let bucket = &planned.bucket.name;
        let profile = &planned.profile;
        let argv = self.build_args(planned, level);
        let Some((program, args)) = argv.split_first() else {
            return Err(RunnerError::EmptyCommand);
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
                        bucket = %bucket,
                        profile = %profile.name,
                        variable = %name,
                        "secret environment variable not set"
                    );
                }
            }
        }

        tracing::info!(
            bucket = %bucket,
            profile = %profile.name,
            tests = planned.tests.len(),
            command = %argv.join(" "),
            "bucket started"
        );

        let mut child = command.spawn().map_err(|e| RunnerError::Spawn {
            bucket: bucket.clone(),
            reason: e.to_string(),
        })?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (stdout, stderr, status) = tokio::join!(
            stream_output(stdout, bucket, "stdout", profile),
            stream_output(stderr, bucket, "stderr", profile),
            child.wait(),
        );
        let status = status.map_err(|e| RunnerError::Wait {
            bucket: bucket.clone(),
            reason: e.to_string(),
        })?;

        if let Some(summary) = stdout.last() {
            tracing::info!(bucket = %bucket, summary = %summary, "bucket finished");
        }

        if status.success() {
            return Ok(BucketOutcome::Succeeded);
        }

        let mut reason = stdout.joined();
        let stderr = stderr.joined();
        if !stderr.is_empty() {
            if !reason.is_empty() {
                reason.push('\n');
            }
            reason.push_str(&stderr);
        }
        if reason.is_empty() {
            reason = status.to_string();
        }

        Ok(BucketOutcome::Failed {
            exit_code: status.code(),
            reason,
        })
    }
}

/// Appends `flag <selector>` unless the selector selects everything.
fn push_selector(args: &mut Vec<String>, flag: &str, selector: Option<&Selector>) {
    if let Some(selector) = selector.filter(|s| !s.is_select_all()) {
        args.push(flag.to_owned());
        args.push(selector.source().to_owned());
    }
}

/// Last non-blank lines of one output stream.
#[derive(Debug, Default)]
struct OutputTail {
    lines: VecDeque<String>,
}

impl OutputTail {
    fn push(&mut self, line: String) {
        if line.trim().is_empty() {
            return;
        }
        if self.lines.len() == FAILURE_TAIL_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn last(&self) -> Option<&str> {
        self.lines.back().map(|l| l.trim())
    }

    fn joined(&self) -> String {
        self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

/// Logs each redacted line as it arrives and keeps the tail for a failure reason.
async fn stream_output<R>(
    reader: Option<R>,
    bucket: &str,
    stream: &'static str,
    profile: &ProvisioningProfile,
) -> OutputTail
where
    R: AsyncRead + Unpin,
{
    let mut tail = OutputTail::default();
    let Some(reader) = reader else {
        return tail;
    };

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = redact(String::from_utf8_lossy(&buf).trim_end(), profile);
                tracing::info!(bucket = %bucket, stream, "{line}");
                tail.push(line);
            }
            Err(e) => {
                tracing::warn!(bucket = %bucket, stream, error = %e, "failed to read output");
                break;
            }
        }
    }
    tail
}

#[cfg(test)]
mod tests {
    use super::*;
    use testgate_core::types::{ProfileKind, ProvisioningProfile};
    use testgate_planner::Bucket;

    fn planned(marker: &str, keyword: Option<&str>) -> PlannedBucket {
        let mut bucket = Bucket::new("ondemand-aws-local-tests", TriggerLevel::Release, marker, "aws")
            .unwrap();
        if let Some(keyword) = keyword {
            bucket = bucket.with_keyword(keyword).unwrap();
        }
        PlannedBucket {
            bucket,
            profile: ProvisioningProfile::new("aws", ProfileKind::Aws),
            tests: vec!["tests/test_up.py::test_up[ondemand_aws_cluster]".to_owned()],
        }
    }

    fn executor() -> PytestExecutor {
        PytestExecutor::new(vec!["pytest".to_owned(), "-v".to_owned()], "tests").unwrap()
    }

    #[test]
    fn builds_marker_only_invocation() {
        let args = executor().build_args(&planned("not clustertest", None), TriggerLevel::Local);
        assert_eq!(
            args,
            vec!["pytest", "-v", "--level", "local", "-m", "not clustertest", "tests"]
        );
    }

    #[test]
    fn builds_keyword_invocation() {
        let args = executor().build_args(
            &planned(
                "ondemand and not multinode",
                Some("ondemand_aws_cluster and not den_launched"),
            ),
            TriggerLevel::Release,
        );
        assert_eq!(
            args,
            vec![
                "pytest",
                "-v",
                "--level",
                "release",
                "-m",
                "ondemand and not multinode",
                "-k",
                "ondemand_aws_cluster and not den_launched",
                "tests",
            ]
        );
    }

    #[test]
    fn empty_test_path_is_omitted() {
        let exec = PytestExecutor::new(vec!["pytest".to_owned()], "").unwrap();
        let args = exec.build_args(&planned("multinode", None), TriggerLevel::Release);
        assert_eq!(args.last().map(String::as_str), Some("multinode"));
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(matches!(
            PytestExecutor::new(Vec::new(), "tests"),
            Err(RunnerError::EmptyCommand)
        ));
    }

    #[test]
    fn select_all_marker_omits_marker_flag() {
        let args = executor().build_args(&planned("*", None), TriggerLevel::Local);
        assert_eq!(args, vec!["pytest", "-v", "--level", "local", "tests"]);
    }

    #[test]
    fn select_all_keyword_omits_keyword_flag() {
        let args = executor().build_args(&planned("multinode", Some("*")), TriggerLevel::Release);
        assert_eq!(
            args,
            vec!["pytest", "-v", "--level", "release", "-m", "multinode", "tests"]
        );
    }

    #[test]
    fn output_tail_keeps_last_lines() {
        let mut tail = OutputTail::default();
        for i in 0..(FAILURE_TAIL_LINES + 5) {
            tail.push(format!("line {i}"));
        }
        assert_eq!(tail.lines.len(), FAILURE_TAIL_LINES);
        assert_eq!(tail.lines.front().map(String::as_str), Some("line 5"));
        assert_eq!(tail.last(), Some(format!("line {}", FAILURE_TAIL_LINES + 4).as_str()));
    }

    #[test]
    fn output_tail_skips_blank_lines() {
        let mut tail = OutputTail::default();
        tail.push("=== 3 passed ===".to_owned());
        tail.push("   ".to_owned());
        assert_eq!(tail.last(), Some("=== 3 passed ==="));
        assert_eq!(tail.joined(), "=== 3 passed ===");
        assert_eq!(OutputTail::default().last(), None);
    }

    #[tokio::test]
    async fn successful_command_succeeds() {
        let exec = PytestExecutor::new(vec!["true".to_owned()], "").unwrap();
        let outcome = exec
            .run(&planned("multinode", None), TriggerLevel::Release)
            .await
            .unwrap();
        assert_eq!(outcome, BucketOutcome::Succeeded);
    }

    #[tokio::test]
    async fn failing_command_reports_exit_code() {
        let exec = PytestExecutor::new(
            vec!["sh".to_owned(), "-c".to_owned(), "echo 1 failed; exit 1".to_owned()],
            "",
        )
        .unwrap();
        let outcome = exec
            .run(&planned("multinode", None), TriggerLevel::Release)
            .await
            .unwrap();
        match outcome {
            BucketOutcome::Failed { exit_code, reason } => {
                assert_eq!(exit_code, Some(1));
                assert!(reason.contains("1 failed"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failure_reason_is_redacted_tail_of_both_streams() {
        let exec = PytestExecutor::new(
            vec![
                "sh".to_owned(),
                "-c".to_owned(),
                "i=1; while [ $i -le 30 ]; do echo \"out $i\"; i=$((i+1)); done; echo 'token s3cr3t' >&2; exit 2"
                    .to_owned(),
            ],
            "",
        )
        .unwrap();
        let mut bucket = planned("multinode", None);
        bucket.profile.env.insert("DEN_TESTER_TOKEN".to_owned(), "s3cr3t".to_owned());

        let outcome = exec.run(&bucket, TriggerLevel::Release).await.unwrap();

        match outcome {
            BucketOutcome::Failed { exit_code, reason } => {
                assert_eq!(exit_code, Some(2));
                assert!(!reason.lines().any(|l| l == "out 10"));
                assert!(reason.contains("out 30"));
                assert!(!reason.contains("s3cr3t"));
                assert!(reason.contains("token"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let exec =
            PytestExecutor::new(vec!["/nonexistent/testgate-pytest".to_owned()], "").unwrap();
        let result = exec
            .run(&planned("multinode", None), TriggerLevel::Release)
            .await;
        assert!(matches!(result, Err(RunnerError::Spawn { .. })));
    }
}
