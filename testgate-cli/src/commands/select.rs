//! `testgate select` command handler
//!
//! Without `--tags`, `--name` or `--corpus` only parses the expression and
//! prints its canonical form.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use testgate_core::types::{DEFAULT_TAXONOMY, TagSet, TriggerLevel};
use testgate_planner::CorpusLoader;
use testgate_selector::Selector;

use crate::cli::SelectArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `select` command.
pub async fn execute(
    args: SelectArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let selector = Selector::parse(&args.expression)?;

    let report = if args.corpus {
        let config = super::load_config(config_path).await?;
        let level = args
            .level
            .as_deref()
            .map(|l| {
                l.parse::<TriggerLevel>()
                    .map_err(|e| CliError::Command(e.to_string()))
            })
            .transpose()?;
        let corpus = CorpusLoader::load_file(&config.planner.corpus_path).await?;

        let selected = corpus
            .tests()
            .iter()
            .filter(|t| level.is_none_or(|l| t.applies_to(l)))
            .filter(|t| {
                if args.keyword {
                    selector.matches_keywords(&t.name)
                } else {
                    selector.matches_tags(&t.tags)
                }
            })
            .map(|t| t.name.clone())
            .collect();

        let mut report = SelectReport::new(&selector);
        if !args.keyword {
            report.unknown_terms = unknown_terms(&selector, &config.planner.taxonomy);
        }
        report.selected = Some(selected);
        report
    } else if let Some(tags) = args.tags {
        let tag_set: TagSet = tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect();
        let mut report = SelectReport::new(&selector);
        report.unknown_terms = unknown_terms(&selector, &[]);
        report.matched = Some(selector.matches_tags(&tag_set));
        report
    } else if let Some(name) = args.name {
        let mut report = SelectReport::new(&selector);
        report.matched = Some(selector.matches_keywords(&name));
        report
    } else {
        let mut report = SelectReport::new(&selector);
        report.unknown_terms = unknown_terms(&selector, &[]);
        report
    };

    writer.render(&report)?;
    Ok(())
}

/// Terms that are not in the taxonomy. An empty taxonomy means the default one.
fn unknown_terms(selector: &Selector, taxonomy: &[String]) -> Vec<String> {
    selector
        .terms()
        .into_iter()
        .filter(|term| {
            if taxonomy.is_empty() {
                !DEFAULT_TAXONOMY.contains(term)
            } else {
                !taxonomy.iter().any(|t| t == term)
            }
        })
        .map(str::to_owned)
        .collect()
}

/// Selector evaluation result.
#[derive(Debug, Serialize)]
pub struct SelectReport {
    pub expression: String,
    pub canonical: String,
    pub terms: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown_terms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<Vec<String>>,
}

impl SelectReport {
    fn new(selector: &Selector) -> Self {
        Self {
            expression: selector.source().to_owned(),
            canonical: selector.canonical(),
            terms: selector.terms().into_iter().map(str::to_owned).collect(),
            unknown_terms: Vec::new(),
            matched: None,
            selected: None,
        }
    }
}

impl Render for SelectReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Expression: {}", self.expression)?;
        writeln!(w, "Canonical:  {}", self.canonical)?;
        if !self.terms.is_empty() {
            writeln!(w, "Terms:      {}", self.terms.join(", "))?;
        }
        for term in &self.unknown_terms {
            writeln!(
                w,
                "{} '{}' is not a known tag and never matches",
                "warning:".yellow(),
                term
            )?;
        }

        if let Some(matched) = self.matched {
            let label = if matched {
                "MATCH".green().bold()
            } else {
                "NO MATCH".red().bold()
            };
            writeln!(w, "Result:     {}", label)?;
        }

        if let Some(selected) = &self.selected {
            writeln!(w, "Selected {} tests:", selected.len())?;
            for name in selected {
                writeln!(w, "  {}", name)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;

    fn args(expression: &str) -> SelectArgs {
        SelectArgs {
            expression: expression.to_owned(),
            tags: None,
            name: None,
            corpus: false,
            keyword: false,
            level: None,
        }
    }

    #[test]
    fn unknown_terms_use_default_taxonomy() {
        let selector = Selector::parse("clustertest and not gpu").unwrap();
        assert_eq!(unknown_terms(&selector, &[]), vec!["gpu"]);
    }

    #[test]
    fn unknown_terms_use_configured_taxonomy() {
        let selector = Selector::parse("gpu or clustertest").unwrap();
        let taxonomy = vec!["gpu".to_owned()];
        assert_eq!(unknown_terms(&selector, &taxonomy), vec!["clustertest"]);
    }

    #[test]
    fn report_renders_match_result() {
        colored::control::set_override(false);
        let selector = Selector::parse("clustertest and not ondemand").unwrap();
        let mut report = SelectReport::new(&selector);
        report.matched = Some(true);

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("Terms:      clustertest, ondemand"));
        assert!(text.contains("Result:     MATCH"));
    }

    #[tokio::test]
    async fn invalid_expression_is_command_error() {
        let writer = OutputWriter::new(OutputFormat::Json);
        let err = execute(args("clustertest and"), Path::new("unused.toml"), &writer)
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn tag_mode_does_not_read_config() {
        let writer = OutputWriter::new(OutputFormat::Json);
        let mut select = args("servertest or secrettest");
        select.tags = Some(vec!["secrettest".to_owned()]);
        execute(select, Path::new("/nonexistent/testgate.toml"), &writer)
            .await
            .unwrap();
    }
}
