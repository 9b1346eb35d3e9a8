//! testgate -- CI test bucket planner, partition check and leak check.
//!
//! Exit codes: 0 success, 1 command error, 2 configuration error,
//! 3 plan rejected, 4 leak check failed, 5 bucket failures, 10 IO error.

mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level; logs go to stderr so JSON output stays clean
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(cli.log_level.as_deref().unwrap_or("warn"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let writer = OutputWriter::new(cli.output);
    let config_path = cli.config;

    let result = match cli.command {
        Commands::Plan(args) => commands::plan::execute(args, &config_path, &writer).await,
        Commands::Verify(args) => commands::verify::execute(args, &config_path, &writer).await,
        Commands::Select(args) => commands::select::execute(args, &config_path, &writer).await,
        Commands::LeakCheck(args) => {
            commands::leak_check::execute(args, &config_path, &writer).await
        }
        Commands::Run(args) => commands::run::execute(args, &config_path, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &config_path, &writer).await,
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}
