//! Command handlers -- one module per subcommand

pub mod config;
pub mod leak_check;
pub mod plan;
pub mod run;
pub mod select;
pub mod verify;

use std::path::Path;

use testgate_core::config::TestgateConfig;
use testgate_core::types::TriggerEvent;

use crate::error::CliError;

/// Load, override and validate the configuration file.
async fn load_config(config_path: &Path) -> Result<TestgateConfig, CliError> {
    tracing::debug!(path = %config_path.display(), "loading configuration");
    Ok(TestgateConfig::load(config_path).await?)
}

fn parse_trigger(s: &str) -> Result<TriggerEvent, CliError> {
    s.parse()
        .map_err(|e: testgate_core::ConfigError| CliError::Command(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trigger_accepts_aliases() {
        assert_eq!(parse_trigger("nightly").unwrap(), TriggerEvent::Schedule);
        assert_eq!(parse_trigger("pr").unwrap(), TriggerEvent::PullRequest);
    }

    #[test]
    fn parse_trigger_rejects_unknown() {
        let err = parse_trigger("tag").unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("unknown trigger"));
    }
}
