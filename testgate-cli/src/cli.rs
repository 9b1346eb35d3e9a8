//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// testgate -- CI test bucket planner and leak check.
///
/// Use `testgate <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "testgate", version, about, long_about = None)]
pub struct Cli {
    /// Path to the testgate.toml configuration file.
    #[arg(short, long, default_value = "testgate.toml", global = true)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the buckets a trigger event activates.
    Plan(PlanArgs),

    /// Check that active buckets partition the test corpus.
    Verify(VerifyArgs),

    /// Evaluate a selector expression.
    Select(SelectArgs),

    /// Query provisioning targets for leaked resources.
    LeakCheck(LeakCheckArgs),

    /// Plan, run every bucket, then run the leak check.
    Run(RunArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- plan ----

/// Show the execution plan for a trigger event.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Trigger event (push, pull_request, workflow_dispatch, schedule).
    #[arg(short, long)]
    pub trigger: String,

    /// List the tests routed to each bucket.
    #[arg(long)]
    pub tests: bool,
}

// ---- verify ----

/// Run the partition check.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Verify only the level this trigger event selects.
    #[arg(short, long, conflicts_with = "all")]
    pub trigger: Option<String>,

    /// Verify every trigger level (default when no trigger is given).
    #[arg(long)]
    pub all: bool,
}

// ---- select ----

/// Evaluate a selector expression against tags, a test name or the corpus.
#[derive(Args, Debug)]
pub struct SelectArgs {
    /// Selector expression, e.g. "clustertest and not ondemand".
    pub expression: String,

    /// Comma-separated tag set to evaluate against.
    #[arg(long, value_delimiter = ',', conflicts_with_all = ["name", "corpus"])]
    pub tags: Option<Vec<String>>,

    /// Test name to evaluate against as a keyword expression.
    #[arg(long, conflicts_with = "corpus")]
    pub name: Option<String>,

    /// List the corpus tests the expression selects.
    #[arg(long)]
    pub corpus: bool,

    /// With --corpus, match test names (`-k`) instead of tags (`-m`).
    #[arg(long, requires = "corpus")]
    pub keyword: bool,

    /// With --corpus, only consider tests that apply to this level.
    #[arg(long, requires = "corpus")]
    pub level: Option<String>,
}

// ---- leak-check ----

/// Run the leak check against configured profiles.
#[derive(Args, Debug)]
pub struct LeakCheckArgs {
    /// Only check these profiles (repeatable). Default: every cloud profile.
    #[arg(short, long)]
    pub profile: Vec<String>,

    /// Query once immediately, without grace delay or polling.
    #[arg(long)]
    pub once: bool,
}

// ---- run ----

/// Execute a full run.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Trigger event (push, pull_request, workflow_dispatch, schedule).
    #[arg(short, long)]
    pub trigger: String,
}

// ---- config ----

/// Manage testgate configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, planner, runner, leak_check, profiles).
        #[arg(long)]
        section: Option<String>,
    },
}
