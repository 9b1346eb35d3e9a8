//! Status listing parser.
//!
//! Each line of a status listing is matched against a pattern with `name` and
//! `status` capture groups. A resource counts as leaked when its status is one
//! of the configured running states and its name matches the attribution
//! pattern (resources owned by CI runs).

use regex::Regex;
use serde::Serialize;
use testgate_core::config::LeakCheckConfig;

use crate::error::LeakCheckError;

/// One resource line from a status listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub name: String,
    pub status: String,
}

/// Compiled status parser.
#[derive(Debug, Clone)]
pub struct StatusParser {
    line: Regex,
    attribution: Regex,
    running_states: Vec<String>,
}

impl StatusParser {
    /// Compiles the line and attribution patterns.
    ///
    /// # Errors
    ///
    /// Returns `LeakCheckError::Pattern` if either pattern fails to compile,
    /// or if the line pattern lacks a `name` or `status` group.
    pub fn new(
        line_pattern: &str,
        resource_pattern: &str,
        running_states: Vec<String>,
    ) -> Result<Self, LeakCheckError> {
        let line = Regex::new(line_pattern).map_err(|e| LeakCheckError::Pattern {
            field: "status_line_pattern".to_owned(),
            reason: e.to_string(),
        })?;

        for group in ["name", "status"] {
            if !line.capture_names().flatten().any(|n| n == group) {
                return Err(LeakCheckError::Pattern {
                    field: "status_line_pattern".to_owned(),
                    reason: format!("missing named group '{group}'"),
                });
            }
        }

        let attribution = Regex::new(resource_pattern).map_err(|e| LeakCheckError::Pattern {
            field: "resource_pattern".to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            line,
            attribution,
            running_states,
        })
    }

    pub fn from_config(config: &LeakCheckConfig) -> Result<Self, LeakCheckError> {
        Self::new(
            &config.status_line_pattern,
            &config.resource_pattern,
            config.running_states.clone(),
        )
    }

    /// Parses every recognisable resource line.
    pub fn parse(&self, listing: &str) -> Vec<Resource> {
        listing
            .lines()
            .filter_map(|line| {
                let caps = self.line.captures(line.trim_end())?;
                Some(Resource {
                    name: caps.name("name")?.as_str().to_owned(),
                    status: caps.name("status")?.as_str().to_owned(),
                })
            })
            .collect()
    }

    /// Resources that are both running and attributable to CI.
    pub fn leaked(&self, listing: &str) -> Vec<Resource> {
        self.parse(listing)
            .into_iter()
            .filter(|r| self.is_running(&r.status) && self.attribution.is_match(&r.name))
            .collect()
    }

    fn is_running(&self, status: &str) -> bool {
        self.running_states
            .iter()
            .any(|s| s.eq_ignore_ascii_case(status))
    }
}
