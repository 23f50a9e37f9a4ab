//! Per-source and total results of a migration run.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::document::model::{ContentType, SiteTag};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub name: String,
    pub site: SiteTag,
    pub exported: usize,
    pub imported: usize,
    /// Import failures plus documents rejected during export.
    pub failed: usize,
    pub skipped_types: Vec<(ContentType, String)>,
    /// Documents written without their references.
    pub degraded: Vec<String>,
    /// Set when the whole source failed; counts are then zero.
    pub error: Option<String>,
}

impl SourceReport {
    pub fn failed_source(name: impl Into<String>, site: SiteTag, error: impl fmt::Display) -> Self {
        Self {
            name: name.into(),
            site,
            exported: 0,
            imported: 0,
            failed: 0,
            skipped_types: Vec::new(),
            degraded: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
}

impl MigrationReport {
    pub fn total_imported(&self) -> usize {
        self.sources.iter().map(|s| s.imported).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.sources.iter().map(|s| s.failed).sum()
    }

    pub fn source(&self, site: &SiteTag) -> Option<&SourceReport> {
        self.sources.iter().find(|s| &s.site == site)
    }
}

const RULE_WIDTH: usize = 60;

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(f, "Migration Summary")?;
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))?;
        for source in &self.sources {
            write!(
                f,
                "{:<28} {:>6} imported, {:>4} failed",
                source.name, source.imported, source.failed
            )?;
            if let Some(error) = &source.error {
                write!(f, "  (error: {error})")?;
            }
            writeln!(f)?;
            if !source.degraded.is_empty() {
                writeln!(f, "  {} written without references", source.degraded.len())?;
            }
        }
        writeln!(f, "{}", "-".repeat(RULE_WIDTH))?;
        writeln!(
            f,
            "{:<28} {:>6} imported, {:>4} failed",
            "Total",
            self.total_imported(),
            self.total_failed()
        )?;
        let elapsed = self.finished_at - self.started_at;
        write!(f, "Finished in {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0)
    }
}
