//! Source export: read every known type from one source dataset and turn the
//! documents into their consolidated form.
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::batch::MigrationBatch;
use crate::config::SourceConfig;
use crate::document::id::{NamespacedId, DRAFT_PREFIX};
use crate::document::model::{ContentType, Document, SiteTag, BOOKKEEPING_FIELDS};
use crate::document::reference::transform_references;
use crate::document::validate::ValidationError;
use crate::error::MigrationError;
use crate::events::bus::EventBus;
use crate::events::types::MigrationEvent;
use crate::normalize::normalize;
use crate::store::{ContentStore, DocumentQuery};

/// A source document that could not be transformed.
#[derive(Debug)]
pub struct RejectedDocument {
    /// `_id` as found in the source, when it had one.
    pub source_id: Option<String>,
    pub doc_type: ContentType,
    pub error: MigrationError,
}

#[derive(Debug, Default)]
pub struct ExportOutcome {
    pub batch: MigrationBatch,
    /// Types whose query failed; exported as empty.
    pub skipped_types: Vec<(ContentType, MigrationError)>,
    pub rejected: Vec<RejectedDocument>,
}

/// Turn one raw source document into its consolidated form.
///
/// Bookkeeping fields are dropped, the site is set, the id is namespaced,
/// the schema normalized and finally every reference namespaced. Each id is
/// transformed exactly once.
pub fn transform_document(
    raw: Value,
    doc_type: ContentType,
    site: &SiteTag,
) -> Result<Document, MigrationError> {
    let Value::Object(mut fields) = raw else {
        return Err(ValidationError::NotAnObject.into());
    };
    let original_id = match fields.get("_id").and_then(Value::as_str) {
        Some("" | DRAFT_PREFIX) => return Err(ValidationError::EmptyId.into()),
        Some(id) => id.to_string(),
        None => return Err(ValidationError::MissingId.into()),
    };
    for field in BOOKKEEPING_FIELDS {
        fields.remove(field);
    }

    let id = NamespacedId::from_source(&original_id, site);
    let mut document = normalize(&Document::new(id, doc_type, fields));
    document.fields = transform_references(&document.fields, site);
    Ok(document)
}

pub struct Exporter<'a> {
    store: &'a dyn ContentStore,
    events: &'a EventBus,
}

impl<'a> Exporter<'a> {
    pub fn new(store: &'a dyn ContentStore, events: &'a EventBus) -> Self {
        Self { store, events }
    }

    /// Export every known type from the source. Never fails as a whole: a
    /// failing query is recorded as a skipped type, a bad document as rejected.
    pub async fn export(&self, source: &SourceConfig) -> ExportOutcome {
        info!(source = %source.name, store = %self.store.describe(), "exporting");
        let mut outcome = ExportOutcome::default();

        for doc_type in ContentType::IMPORT_ORDER {
            let items = match self.store.fetch(&DocumentQuery::OfType(doc_type)).await {
                Ok(items) => items,
                Err(err) => {
                    warn!(source = %source.name, %doc_type, error = %err, "skipping type");
                    self.events.publish(MigrationEvent::TypeSkipped {
                        source: source.name.clone(),
                        doc_type,
                        reason: err.to_string(),
                    });
                    outcome.skipped_types.push((doc_type, err.into()));
                    continue;
                }
            };

            let found = items.len();
            for raw in items {
                let source_id = raw.get("_id").and_then(Value::as_str).map(str::to_string);
                match transform_document(raw, doc_type, &source.site) {
                    Ok(document) => {
                        debug!(id = %document.id, "transformed");
                        outcome.batch.push(document);
                    }
                    Err(error) => {
                        warn!(source = %source.name, id = ?source_id, %error, "rejecting document");
                        self.events.publish(MigrationEvent::DocumentRejected {
                            source: source.name.clone(),
                            document_id: source_id.clone().unwrap_or_default(),
                            reason: error.to_string(),
                        });
                        outcome.rejected.push(RejectedDocument {
                            source_id,
                            doc_type,
                            error,
                        });
                    }
                }
            }

            if found > 0 {
                info!(source = %source.name, %doc_type, count = found, "found documents");
            }
            self.events.publish(MigrationEvent::TypeExported {
                source: source.name.clone(),
                doc_type,
                count: outcome.batch.of_type(doc_type).len(),
            });
        }

        info!(
            source = %source.name,
            total = outcome.batch.len(),
            rejected = outcome.rejected.len(),
            "export finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn acme() -> SiteTag {
        SiteTag::parse("acme").unwrap()
    }

    #[test]
    fn transform_strips_bookkeeping_and_namespaces() {
        let raw = json!({
            "_id": "wp1",
            "_type": "whitepaper",
            "_rev": "r1",
            "_createdAt": "2024-01-01T00:00:00Z",
            "_updatedAt": "2024-01-02T00:00:00Z",
            "site": "legacy",
            "title": "Glass",
            "categories": [{"_type": "reference", "_ref": "cat1"}]
        });
        let doc = transform_document(raw, ContentType::Whitepaper, &acme()).unwrap();
        assert_eq!(
            doc.to_value(),
            json!({
                "_id": "acme--wp1",
                "_type": "whitepaper",
                "site": "acme",
                "title": "Glass",
                "categories": [{"_type": "reference", "_ref": "acme--cat1"}]
            })
        );
    }

    #[test]
    fn legacy_blog_reference_is_namespaced_once() {
        let raw = json!({
            "_id": "drafts.post1",
            "_type": "blog",
            "author": {"name": "Jane"},
            "parentWhitePaper": {"_type": "reference", "_ref": "wp1"}
        });
        let doc = transform_document(raw, ContentType::Blog, &acme()).unwrap();
        assert_eq!(doc.id.to_string(), "drafts.acme--post1");
        assert_eq!(
            doc.fields["referencedWhitepapers"],
            json!([{"_type": "reference", "_ref": "acme--wp1"}])
        );
    }

    #[test]
    fn transform_rejects_documents_without_id() {
        let err = transform_document(json!({"_type": "blog"}), ContentType::Blog, &acme()).unwrap_err();
        assert!(matches!(err, MigrationError::Invalid(ValidationError::MissingId)));
    }

    #[test]
    fn transform_rejects_empty_id() {
        let raw = json!({"_id": "", "_type": "blog", "author": 42});
        let err = transform_document(raw, ContentType::Blog, &acme()).unwrap_err();
        assert!(matches!(err, MigrationError::Invalid(ValidationError::EmptyId)));
    }

    #[test]
    fn bare_draft_marker_is_not_an_id() {
        let raw = json!({"_id": "drafts.", "_type": "video"});
        let err = transform_document(raw, ContentType::Video, &acme()).unwrap_err();
        assert!(matches!(err, MigrationError::Invalid(ValidationError::EmptyId)));
    }

    #[test]
    fn exported_ids_survive_the_ndjson_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acme.ndjson");
        let docs: Vec<Document> = ["drafts.x", "y--z", "drafts.a.b"]
            .into_iter()
            .map(|id| transform_document(json!({"_id": id}), ContentType::Video, &acme()).unwrap())
            .collect();

        crate::ndjson::write_ndjson(&path, &docs).unwrap();
        let read: Vec<Document> = crate::ndjson::read_ndjson(&path)
            .unwrap()
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(read, docs);
    }

    #[test]
    fn unknown_author_shape_does_not_reject() {
        let raw = json!({"_id": "p1", "author": 42});
        let doc = transform_document(raw, ContentType::Blog, &acme()).unwrap();
        assert_eq!(doc.fields["author"], json!(42));
    }
}
