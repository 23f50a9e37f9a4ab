use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::model::ContentType;

/// Progress events emitted while a migration runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MigrationEvent {
    SourceStarted {
        source: String,
        site: String,
        timestamp: DateTime<Utc>,
    },
    TypeExported {
        source: String,
        doc_type: ContentType,
        count: usize,
    },
    TypeSkipped {
        source: String,
        doc_type: ContentType,
        reason: String,
    },
    DocumentRejected {
        source: String,
        document_id: String,
        reason: String,
    },
    TypeImported {
        doc_type: ContentType,
        imported: usize,
        failed: usize,
    },
    DocumentImported {
        document_id: String,
        without_references: bool,
    },
    DocumentFailed {
        document_id: String,
        reason: String,
    },
    SourceFinished {
        source: String,
        imported: usize,
        failed: usize,
    },
    SourceFailed {
        source: String,
        reason: String,
    },
}
