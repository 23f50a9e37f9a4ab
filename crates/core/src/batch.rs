use std::collections::BTreeMap;

use crate::document::model::{ContentType, Document};

/// Documents grouped by type, produced by one export (or one NDJSON file) and
/// consumed by one import. Lives only for the run that created it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationBatch {
    documents: BTreeMap<ContentType, Vec<Document>>,
}

impl MigrationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, document: Document) {
        self.documents
            .entry(document.doc_type)
            .or_default()
            .push(document);
    }

    /// Documents of one type, in the order they were added.
    pub fn of_type(&self, doc_type: ContentType) -> &[Document] {
        self.documents
            .get(&doc_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.documents.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every document, types in import order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        ContentType::IMPORT_ORDER
            .into_iter()
            .flat_map(move |doc_type| self.of_type(doc_type).iter())
    }
}

impl FromIterator<Document> for MigrationBatch {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        let mut batch = MigrationBatch::new();
        for document in iter {
            batch.push(document);
        }
        batch
    }
}
