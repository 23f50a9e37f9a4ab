//! Target import: upsert a batch in dependency order, retrying each failed
//! document once without its references.
use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::batch::MigrationBatch;
use crate::document::model::{ContentType, Document};
use crate::events::bus::EventBus;
use crate::events::types::MigrationEvent;
use crate::store::{ContentStore, StoreError};

#[derive(Debug)]
pub enum ImportStatus {
    Imported,
    /// The full write failed; the write with references stripped succeeded.
    ImportedWithoutReferences { error: StoreError },
    Failed {
        error: StoreError,
        retry_error: StoreError,
    },
}

impl ImportStatus {
    pub fn is_imported(&self) -> bool {
        !matches!(self, ImportStatus::Failed { .. })
    }
}

#[derive(Debug)]
pub struct DocumentOutcome {
    pub id: String,
    pub doc_type: ContentType,
    pub status: ImportStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeCounts {
    pub imported: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub imported: usize,
    pub failed: usize,
    pub per_type: BTreeMap<ContentType, TypeCounts>,
    /// One entry per document, in write order.
    pub outcomes: Vec<DocumentOutcome>,
}

impl ImportStats {
    /// Ids written only after stripping references; candidates for a repair pass.
    pub fn degraded_ids(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|o| match o.status {
            ImportStatus::ImportedWithoutReferences { .. } => Some(o.id.as_str()),
            _ => None,
        })
    }

    fn record(&mut self, outcome: DocumentOutcome) {
        let counts = self.per_type.entry(outcome.doc_type).or_default();
        if outcome.status.is_imported() {
            self.imported += 1;
            counts.imported += 1;
        } else {
            self.failed += 1;
            counts.failed += 1;
        }
        self.outcomes.push(outcome);
    }
}

pub struct Importer<'a> {
    store: &'a dyn ContentStore,
    events: &'a EventBus,
}

impl<'a> Importer<'a> {
    pub fn new(store: &'a dyn ContentStore, events: &'a EventBus) -> Self {
        Self { store, events }
    }

    /// Import every document of the batch. Never aborts on a single document;
    /// writes already made stay committed.
    pub async fn import(&self, batch: &MigrationBatch) -> ImportStats {
        let mut stats = ImportStats::default();

        for doc_type in ContentType::IMPORT_ORDER {
            let documents = batch.of_type(doc_type);
            if documents.is_empty() {
                continue;
            }
            info!(%doc_type, count = documents.len(), store = %self.store.describe(), "importing");

            for document in documents {
                let outcome = self.import_document(document).await;
                stats.record(outcome);
            }

            let counts = stats.per_type.get(&doc_type).copied().unwrap_or_default();
            info!(%doc_type, imported = counts.imported, failed = counts.failed, "type imported");
            self.events.publish(MigrationEvent::TypeImported {
                doc_type,
                imported: counts.imported,
                failed: counts.failed,
            });
        }

        stats
    }

    async fn import_document(&self, document: &Document) -> DocumentOutcome {
        let id = document.id.to_string();
        let status = match self.store.create_or_replace(document.to_value()).await {
            Ok(_) => {
                debug!(%id, "imported");
                ImportStatus::Imported
            }
            Err(error) => {
                warn!(%id, %error, "write failed, retrying without references");
                let stripped = document.without_references();
                match self.store.create_or_replace(stripped.to_value()).await {
                    Ok(_) => ImportStatus::ImportedWithoutReferences { error },
                    Err(retry_error) => {
                        warn!(%id, error = %retry_error, "retry failed");
                        ImportStatus::Failed { error, retry_error }
                    }
                }
            }
        };

        let event = match &status {
            ImportStatus::Imported => MigrationEvent::DocumentImported {
                document_id: id.clone(),
                without_references: false,
            },
            ImportStatus::ImportedWithoutReferences { .. } => MigrationEvent::DocumentImported {
                document_id: id.clone(),
                without_references: true,
            },
            ImportStatus::Failed { retry_error, .. } => MigrationEvent::DocumentFailed {
                document_id: id.clone(),
                reason: retry_error.to_string(),
            },
        };
        self.events.publish(event);

        DocumentOutcome {
            id,
            doc_type: document.doc_type,
            status,
        }
    }
}
