//! `testgate verify` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use testgate_core::types::TriggerLevel;
use testgate_planner::{GateState, PartitionReport, Planner};

use crate::cli::VerifyArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `verify` command.
///
/// Returns `CliError::PlanRejected` (exit code 3) if any verified level has
/// orphans, duplicates or empty buckets.
pub async fn execute(
    args: VerifyArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = super::load_config(config_path).await?;
    let planner = Planner::from_config(&config).await?;

    let levels: Vec<TriggerLevel> = match args.trigger {
        Some(trigger) if !args.all => {
            vec![GateState::from_trigger(super::parse_trigger(&trigger)?).level()]
        }
        _ => TriggerLevel::ALL.to_vec(),
    };

    info!(levels = ?levels, "verifying bucket partition");

    let report = VerifyReport {
        levels: levels
            .into_iter()
            .map(|level| LevelReport::from(&planner.verify(level)))
            .collect(),
    };

    writer.render(&report)?;

    if !report.is_clean() {
        return Err(CliError::PlanRejected(report.summary()));
    }
    Ok(())
}

/// Partition check result for one or more levels.
#[derive(Debug, Serialize)]
pub struct VerifyReport {
    pub levels: Vec<LevelReport>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.levels.iter().all(|l| l.clean)
    }

    fn summary(&self) -> String {
        self.levels
            .iter()
            .filter(|l| !l.clean)
            .map(|l| {
                format!(
                    "{}: {} orphaned, {} duplicated, {} empty buckets",
                    l.level,
                    l.orphans.len(),
                    l.duplicates.len(),
                    l.empty_buckets.len()
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Flattened partition report for output.
#[derive(Debug, Serialize)]
pub struct LevelReport {
    pub level: TriggerLevel,
    pub clean: bool,
    pub applicable: usize,
    pub buckets: Vec<BucketCount>,
    pub orphans: Vec<String>,
    pub duplicates: Vec<String>,
    pub empty_buckets: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BucketCount {
    pub bucket: String,
    pub tests: usize,
}

impl From<&PartitionReport> for LevelReport {
    fn from(report: &PartitionReport) -> Self {
        Self {
            level: report.level,
            clean: report.is_clean(),
            applicable: report.applicable,
            buckets: report
                .selections
                .iter()
                .map(|s| BucketCount {
                    bucket: s.bucket.clone(),
                    tests: s.tests.len(),
                })
                .collect(),
            orphans: report.orphans.clone(),
            duplicates: report.duplicates.iter().map(ToString::to_string).collect(),
            empty_buckets: report.empty_buckets.clone(),
            warnings: report.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Render for LevelReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let verdict = if self.clean {
            "CLEAN".green().bold()
        } else {
            "DEFECTS".red().bold()
        };
        writeln!(
            w,
            "Level {}: {} ({} applicable tests)",
            self.level.to_string().bold(),
            verdict,
            self.applicable
        )?;

        for bucket in &self.buckets {
            let count = if bucket.tests == 0 {
                bucket.tests.to_string().red().to_string()
            } else {
                bucket.tests.to_string()
            };
            writeln!(w, "  {:<40} {:>5}", bucket.bucket, count)?;
        }

        if !self.orphans.is_empty() {
            writeln!(w, "  {} ({}):", "Orphaned tests".red(), self.orphans.len())?;
            for orphan in &self.orphans {
                writeln!(w, "    - {}", orphan)?;
            }
        }
        if !self.duplicates.is_empty() {
            writeln!(w, "  {} ({}):", "Duplicated tests".red(), self.duplicates.len())?;
            for duplicate in &self.duplicates {
                writeln!(w, "    - {}", duplicate)?;
            }
        }
        if !self.empty_buckets.is_empty() {
            writeln!(w, "  {} ({}):", "Empty buckets".red(), self.empty_buckets.len())?;
            for bucket in &self.empty_buckets {
                writeln!(w, "    - {}", bucket)?;
            }
        }
        for warning in &self.warnings {
            writeln!(w, "  {} {}", "warning:".yellow(), warning)?;
        }
        Ok(())
    }
}

impl Render for VerifyReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        for (i, level) in self.levels.iter().enumerate() {
            if i > 0 {
                writeln!(w)?;
            }
            level.render_text(w)?;
        }
        Ok(())
    }
}
