//! CLI argument definitions for testgate-runner.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use testgate_core::config::TestgateConfig;
use testgate_core::error::TestgateError;

/// testgate CI runner.
///
/// Plans the buckets for a trigger event, runs them in parallel and
/// finishes with the leak check barrier. Prints the run report as JSON
/// on stdout.
#[derive(Parser, Debug)]
#[command(name = "testgate-runner")]
#[command(version, about, long_about = None)]
pub struct RunnerCli {
    /// Path to testgate.toml configuration file.
    #[arg(short, long, default_value = "testgate.toml")]
    pub config: PathBuf,

    /// Trigger event (push, pull_request, workflow_dispatch, schedule).
    #[arg(short, long)]
    pub trigger: String,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Build and verify the plan, print it, and exit without running buckets.
    #[arg(long)]
    pub dry_run: bool,
}

impl RunnerCli {
    /// Applies the logging overrides and validates the result again.
    pub fn apply_overrides(&self, config: &mut TestgateConfig) -> Result<(), TestgateError> {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> RunnerCli {
        let argv = ["testgate-runner", "--trigger", "push"]
            .iter()
            .chain(args)
            .copied();
        RunnerCli::try_parse_from(argv).expect("should parse")
    }

    #[test]
    fn parses_trigger_and_defaults() {
        let cli = RunnerCli::try_parse_from(["testgate-runner", "--trigger", "schedule"])
            .expect("should parse");
        assert_eq!(cli.trigger, "schedule");
        assert_eq!(cli.config, PathBuf::from("testgate.toml"));
        assert!(!cli.dry_run);
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn trigger_is_required() {
        assert!(RunnerCli::try_parse_from(["testgate-runner"]).is_err());
    }

    #[test]
    fn parses_overrides() {
        let cli = RunnerCli::try_parse_from([
            "testgate-runner",
            "-c",
            "/etc/testgate.toml",
            "-t",
            "push",
            "--log-level",
            "debug",
            "--log-format",
            "pretty",
            "--dry-run",
        ])
        .expect("should parse");
        assert_eq!(cli.config, PathBuf::from("/etc/testgate.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_format.as_deref(), Some("pretty"));
        assert!(cli.dry_run);
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut config = TestgateConfig::default();
        cli(&["--log-level", "debug", "--log-format", "pretty"])
            .apply_overrides(&mut config)
            .expect("overrides should be valid");
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.log_format, "pretty");
    }

    #[test]
    fn invalid_log_level_override_is_rejected() {
        let mut config = TestgateConfig::default();
        let err = cli(&["--log-level", "verbose"])
            .apply_overrides(&mut config)
            .unwrap_err();
        assert!(err.to_string().contains("general.log_level"));
    }

    #[test]
    fn invalid_log_format_override_is_rejected() {
        let mut config = TestgateConfig::default();
        let err = cli(&["--log-format", "xml"])
            .apply_overrides(&mut config)
            .unwrap_err();
        assert!(err.to_string().contains("general.log_format"));
    }
}
