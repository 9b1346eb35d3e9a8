//! `testgate leak-check` command handler
//!
//! Runs the leak check on its own, outside a full run. Useful after a
//! cancelled CI job, or to confirm a manual cleanup.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use testgate_core::config::LeakCheckConfig;
use testgate_core::types::ProvisioningProfile;
use testgate_leak_check::{CommandStatusClient, LeakChecker, LeakReport, LeakVerdict};
use testgate_planner::merge_profiles;

use crate::cli::LeakCheckArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `leak-check` command.
///
/// Returns `CliError::Leak` (exit code 4) unless every target is clean.
pub async fn execute(
    args: LeakCheckArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = super::load_config(config_path).await?;
    let targets = select_targets(&merge_profiles(&config.profiles), &args.profile)?;

    let mut leak_config = config.leak_check.clone();
    if args.once {
        apply_once(&mut leak_config);
    }

    info!(
        targets = targets.len(),
        once = args.once,
        "running standalone leak check"
    );

    let checker = LeakChecker::from_config(Arc::new(CommandStatusClient::new()), &leak_config)
        .map_err(|e| CliError::Config(e.to_string()))?;
    let report = checker.check(&targets).await;

    writer.render(&LeakCheckOutput(&report))?;

    match report.verdict() {
        LeakVerdict::Clean => Ok(()),
        LeakVerdict::Leaked(resources) => Err(CliError::Leak(format!(
            "{} resources still running",
            resources.len()
        ))),
        LeakVerdict::Inconclusive(reason) => Err(CliError::Leak(format!(
            "inconclusive: {reason}"
        ))),
    }
}

/// Query once immediately: no grace delay, no polling budget.
fn apply_once(config: &mut LeakCheckConfig) {
    config.initial_delay_secs = 0;
    config.max_wait_secs = 0;
}

/// Cloud profiles with a status command, optionally restricted by name.
fn select_targets(
    profiles: &[ProvisioningProfile],
    names: &[String],
) -> Result<Vec<ProvisioningProfile>, CliError> {
    if let Some(unknown) = names
        .iter()
        .find(|name| !profiles.iter().any(|p| &p.name == *name))
    {
        return Err(CliError::Command(format!("unknown profile: {unknown}")));
    }

    let targets: Vec<ProvisioningProfile> = profiles
        .iter()
        .filter(|p| names.is_empty() || names.contains(&p.name))
        .filter(|p| p.is_leak_check_target())
        .cloned()
        .collect();

    if targets.is_empty() {
        return Err(CliError::Command(
            "no leak check targets (need a cloud profile with a status_command)".to_owned(),
        ));
    }
    Ok(targets)
}

/// Serializable view of a leak report.
#[derive(Serialize)]
#[serde(transparent)]
struct LeakCheckOutput<'a>(&'a LeakReport);

impl Render for LeakCheckOutput<'_> {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        render_leak_report(self.0, w)
    }
}

/// Text rendering shared with the `run` command.
pub(crate) fn render_leak_report(report: &LeakReport, w: &mut dyn Write) -> std::io::Result<()> {
    use colored::Colorize;

    let elapsed = (report.finished_at - report.started_at).num_seconds();
    writeln!(w, "Leak check ({} targets, {}s)", report.targets.len(), elapsed)?;

    for target in &report.targets {
        let label = match &target.verdict {
            LeakVerdict::Clean => "CLEAN".green().bold(),
            LeakVerdict::Leaked(_) => "LEAKED".red().bold(),
            LeakVerdict::Inconclusive(_) => "INCONCLUSIVE".yellow().bold(),
        };
        writeln!(
            w,
            "  {:<18} {:<28} {} ({} queries)",
            target.profile, target.target, label, target.queries
        )?;
        match &target.verdict {
            LeakVerdict::Leaked(resources) => {
                for resource in resources {
                    writeln!(w, "    - {} [{}]", resource.name, resource.status)?;
                }
            }
            LeakVerdict::Inconclusive(reason) => {
                writeln!(w, "    {}", reason.dimmed())?;
            }
            LeakVerdict::Clean => {}
        }
    }
    Ok(())
}
