use std::env;
use std::str::FromStr;

use content_migrate_core::config::{ProjectSettings, DEFAULT_API_VERSION, DEFAULT_DATASET};

#[derive(Debug, thiserror::Error)]
pub enum AppConfigError {
    #[error("LOG_FORMAT must be `json` or `human`, got `{0}`")]
    InvalidLogFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Json,
}

impl FromStr for LogFormat {
    type Err = AppConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "human" | "pretty" | "text" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            _ => Err(AppConfigError::InvalidLogFormat(raw.to_string())),
        }
    }
}

/// Settings loaded from the environment (and `.env`, when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Project written to by `import`, `migrate-all` and `repair`.
    pub target_project_id: Option<String>,
    pub target_dataset: String,
    /// Write token for the target project. Never logged.
    pub target_token: Option<String>,
    pub api_version: String,
    /// Overrides the per-project API host, e.g. for a local stand-in.
    pub api_host: Option<String>,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppConfigError> {
        Ok(Self {
            target_project_id: non_empty("TARGET_PROJECT_ID"),
            target_dataset: non_empty("TARGET_DATASET").unwrap_or_else(|| DEFAULT_DATASET.to_string()),
            target_token: non_empty("TARGET_TOKEN"),
            api_version: non_empty("SANITY_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            api_host: non_empty("SANITY_API_HOST"),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: env::var("LOG_FORMAT").unwrap_or_default().parse()?,
        })
    }

    /// Settings for the target dataset. A missing project id or token is
    /// left for `require_write_access` to report.
    pub fn target(&self) -> ProjectSettings {
        let mut settings = self.project(self.target_project_id.clone().unwrap_or_default());
        settings.dataset = self.target_dataset.clone();
        settings.token = self.target_token.clone();
        settings
    }

    /// Settings for any other project, sharing the API version and host.
    pub fn project(&self, project_id: impl Into<String>) -> ProjectSettings {
        let mut settings = ProjectSettings::new(project_id);
        settings.api_version = self.api_version.clone();
        settings.api_host = self.api_host.clone();
        settings
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
