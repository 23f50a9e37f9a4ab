use thiserror::Error;

use crate::config::ConfigError;
use crate::document::validate::ValidationError;
use crate::store::StoreError;

/// Failure of one unit of work (document, type or source).
///
/// Units fail independently; the orchestrator collects these into the report
/// instead of aborting the run.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid document: {0}")]
    Invalid(#[from] ValidationError),

    #[error("source {0} is unreachable: every query failed")]
    SourceUnavailable(String),

    #[error("line {line}: {source}")]
    Ndjson {
        line: usize,
        #[source]
        source: Box<MigrationError>,
    },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
