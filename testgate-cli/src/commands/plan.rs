//! `testgate plan` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use testgate_core::types::{TriggerEvent, TriggerLevel};
use testgate_planner::{GateState, Plan, Planner};

use crate::cli::PlanArgs;
use crate::commands::verify::LevelReport;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `plan` command.
///
/// A rejected plan prints the partition defects and exits with code 3.
pub async fn execute(
    args: PlanArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let trigger = super::parse_trigger(&args.trigger)?;
    let config = super::load_config(config_path).await?;
    let planner = Planner::from_config(&config).await?;

    info!(trigger = %trigger, "building plan");

    match planner.plan(trigger) {
        Ok(plan) => {
            writer.render(&PlanReport::new(&plan, args.tests))?;
            Ok(())
        }
        Err(e) => {
            let level = GateState::from_trigger(trigger).level();
            writer.render(&LevelReport::from(&planner.verify(level)))?;
            Err(e.into())
        }
    }
}

/// Execution plan summary.
#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub trigger: TriggerEvent,
    pub gate: GateState,
    pub level: TriggerLevel,
    pub buckets: Vec<PlannedBucketRow>,
    pub leak_check: bool,
    pub leak_check_targets: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PlannedBucketRow {
    pub name: String,
    pub profile: String,
    pub marker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    pub test_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<String>,
}

impl PlanReport {
    pub fn new(plan: &Plan, with_tests: bool) -> Self {
        let plan = plan.redacted();
        Self {
            trigger: plan.trigger(),
            gate: plan.gate(),
            level: plan.level(),
            buckets: plan
                .buckets()
                .iter()
                .map(|planned| PlannedBucketRow {
                    name: planned.bucket.name.clone(),
                    profile: planned.profile.name.clone(),
                    marker: planned.bucket.marker.source().to_owned(),
                    keyword: planned.bucket.keyword.as_ref().map(|k| k.source().to_owned()),
                    timeout_secs: planned.bucket.timeout_secs,
                    test_count: planned.tests.len(),
                    tests: if with_tests {
                        planned.tests.clone()
                    } else {
                        Vec::new()
                    },
                })
                .collect(),
            leak_check: plan.leak_check_scheduled(),
            leak_check_targets: plan
                .leak_check_targets()
                .iter()
                .map(|p| p.name.clone())
                .collect(),
            warnings: plan.warnings().iter().map(ToString::to_string).collect(),
        }
    }
}

impl Render for PlanReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Plan for {} (gate: {}, level: {})",
            self.trigger.to_string().bold(),
            self.gate,
            self.level.to_string().bold()
        )?;
        writeln!(w)?;
        writeln!(
            w,
            "{:<32} {:<18} {:>6}  {}",
            "BUCKET", "PROFILE", "TESTS", "SELECTOR"
        )?;
        writeln!(w, "{}", "-".repeat(96))?;

        for bucket in &self.buckets {
            let selector = match &bucket.keyword {
                Some(keyword) => format!("-m \"{}\" -k \"{}\"", bucket.marker, keyword),
                None => format!("-m \"{}\"", bucket.marker),
            };
            writeln!(
                w,
                "{:<32} {:<18} {:>6}  {}",
                bucket.name, bucket.profile, bucket.test_count, selector
            )?;
            for test in &bucket.tests {
                writeln!(w, "    {}", test.dimmed())?;
            }
        }

        writeln!(w)?;
        if self.leak_check {
            let targets = if self.leak_check_targets.is_empty() {
                "no cloud targets".to_owned()
            } else {
                self.leak_check_targets.join(", ")
            };
            writeln!(w, "Leak check: {} ({})", "scheduled".yellow().bold(), targets)?;
        } else {
            writeln!(w, "Leak check: not scheduled")?;
        }

        for warning in &self.warnings {
            writeln!(w, "{} {}", "warning:".yellow(), warning)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testgate_core::types::TestCase;
    use testgate_planner::{Corpus, builtin_matrix, default_profiles};

    fn planner() -> Planner {
        let taxonomy = testgate_core::DEFAULT_TAXONOMY
            .iter()
            .map(|t| (*t).to_owned())
            .collect();
        let corpus = Corpus::new(vec![
            TestCase::new("tests/test_a.py::test_server", ["servertest"]),
            TestCase::new("tests/test_a.py::test_secret", ["secrettest"]),
            TestCase::new("tests/test_c.py::test_cluster", ["clustertest"]),
            TestCase::new("tests/test_c.py::test_up[ondemand_aws_cluster]", ["clustertest", "ondemand"])
                .with_levels([TriggerLevel::Release]),
            TestCase::new(
                "tests/test_c.py::test_up[den_launched_ondemand_aws_cluster]",
                ["clustertest", "ondemand"],
            )
            .with_levels([TriggerLevel::Release]),
            TestCase::new("tests/test_c.py::test_up[ondemand_gcp_cluster]", ["clustertest", "ondemand"])
                .with_levels([TriggerLevel::Release]),
            TestCase::new("tests/test_c.py::test_up[ondemand_k8s_cluster]", ["clustertest", "ondemand"])
                .with_levels([TriggerLevel::Release]),
            TestCase::new("tests/test_m.py::test_multinode", ["clustertest", "multinode"])
                .with_levels([TriggerLevel::Release]),
        ])
        .unwrap();
        Planner::new(taxonomy, builtin_matrix().unwrap(), corpus, default_profiles()).unwrap()
    }

    #[test]
    fn schedule_plan_lists_release_buckets_and_leak_check() {
        let plan = planner().plan(TriggerEvent::Schedule).unwrap();
        let report = PlanReport::new(&plan, false);

        assert_eq!(report.level, TriggerLevel::Release);
        assert_eq!(report.buckets.len(), 7);
        assert!(report.leak_check);
        assert!(report.buckets.iter().all(|b| b.tests.is_empty()));

        colored::control::set_override(false);
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("ondemand-aws-local-tests"));
        assert!(text.contains("-k \"ondemand_aws_cluster and not den_launched\""));
        assert!(text.contains("Leak check: scheduled"));
    }

    #[test]
    fn push_plan_has_no_leak_check() {
        let plan = planner().plan(TriggerEvent::Push).unwrap();
        let report = PlanReport::new(&plan, true);

        assert_eq!(report.buckets.len(), 5);
        assert!(!report.leak_check);
        let cluster = report
            .buckets
            .iter()
            .find(|b| b.name == "cluster-tests-local")
            .unwrap();
        assert_eq!(cluster.tests, vec!["tests/test_c.py::test_cluster"]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["trigger"], "push");
        assert_eq!(json["leak_check"], false);
    }
}
