//! Migration configuration: where to read from, where to write to.
//!
//! Built once at startup and validated before any network call.
use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::document::model::SiteTag;

pub const DEFAULT_DATASET: &str = "production";
pub const DEFAULT_API_VERSION: &str = "2024-12-01";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("target write token is not set")]
    MissingToken,
    #[error("target project id is not set")]
    MissingProjectId,
    #[error("no source projects configured")]
    NoSources,
    #[error("site tag {0} is configured for more than one source")]
    DuplicateSite(SiteTag),
    #[error("failed to read sources file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid sources file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Connection settings for one CMS project/dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    pub project_id: String,
    #[serde(default = "default_dataset")]
    pub dataset: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Overrides `https://{projectId}.api.sanity.io`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_host: Option<String>,
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
}

fn default_dataset() -> String {
    DEFAULT_DATASET.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

impl ProjectSettings {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset: default_dataset(),
            api_version: default_api_version(),
            api_host: None,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Base URL of the versioned data API.
    pub fn api_base(&self) -> String {
        let host = match &self.api_host {
            Some(host) => host.trim_end_matches('/').to_string(),
            None => format!("https://{}.api.sanity.io", self.project_id),
        };
        format!("{host}/v{}", self.api_version.trim_start_matches('v'))
    }

    /// Fail unless these settings can be used for writes.
    pub fn require_write_access(&self) -> Result<(), ConfigError> {
        if self.token.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err(ConfigError::MissingToken);
        }
        if self.project_id.trim().is_empty() {
            return Err(ConfigError::MissingProjectId);
        }
        Ok(())
    }
}

/// One source dataset and the site its documents belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub site: SiteTag,
    #[serde(flatten)]
    pub project: ProjectSettings,
}

impl SourceConfig {
    pub fn new(name: impl Into<String>, project_id: impl Into<String>, site: SiteTag) -> Self {
        Self {
            name: name.into(),
            site,
            project: ProjectSettings::new(project_id),
        }
    }

    /// Load a JSON array of sources from a file.
    pub fn load_all(path: &Path, defaults: &ProjectSettings) -> Result<Vec<SourceConfig>, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse_all(&raw, defaults)
    }

    /// Parse a JSON array of sources. Entries without `apiVersion` or
    /// `apiHost` take them from `defaults`.
    pub fn parse_all(raw: &str, defaults: &ProjectSettings) -> Result<Vec<SourceConfig>, ConfigError> {
        let mut entries: Vec<Value> = serde_json::from_str(raw)?;
        for entry in entries.iter_mut().filter_map(Value::as_object_mut) {
            entry
                .entry("apiVersion")
                .or_insert_with(|| Value::String(defaults.api_version.clone()));
            if let Some(host) = &defaults.api_host {
                entry
                    .entry("apiHost")
                    .or_insert_with(|| Value::String(host.clone()));
            }
        }
        Ok(serde_json::from_value(Value::Array(entries))?)
    }
}

/// The legacy sites consolidated by `migrate-all` when no sources file is given.
pub fn default_sources() -> Vec<SourceConfig> {
    [
        ("Windshield Advisor", "23d5d36h", "windshield-advisor"),
        ("Dent Advisor", "n1pctdd7", "dent-advisor"),
        ("XL Benefits", "rm1y6ybn", "xl-benefits"),
        ("Glass Advisor", "m3vvwwn0", "glass-advisor"),
    ]
    .into_iter()
    .filter_map(|(name, project, site)| {
        SiteTag::parse(site)
            .ok()
            .map(|site| SourceConfig::new(name, project, site))
    })
    .collect()
}

#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub target: ProjectSettings,
    pub sources: Vec<SourceConfig>,
}

impl MigrationConfig {
    pub fn new(target: ProjectSettings, sources: Vec<SourceConfig>) -> Self {
        Self { target, sources }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.target.require_write_access()?;
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(&source.site) {
                return Err(ConfigError::DuplicateSite(source.site.clone()));
            }
        }
        Ok(())
    }
}
