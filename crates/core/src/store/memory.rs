//! In-memory content store, used for dry runs and tests.
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ContentStore, DocumentQuery, StoreError};
use crate::document::reference::collect_references;
use crate::mutation::types::{Mutation, MutationResponse, MutationResult, PatchMutation};

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<String, Value>>,
    strict_references: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects writes whose references point at missing
    /// documents, like a dataset with strong references.
    pub fn strict() -> Self {
        Self {
            strict_references: true,
            ..Self::default()
        }
    }

    /// Seed documents as-is, bookkeeping fields included.
    pub fn with_documents(documents: impl IntoIterator<Item = Value>) -> Self {
        let map = documents
            .into_iter()
            .filter_map(|doc| {
                let id = doc.get("_id")?.as_str()?.to_string();
                Some((id, doc))
            })
            .collect();
        Self {
            documents: RwLock::new(map),
            strict_references: false,
        }
    }

    pub async fn get(&self, id: &str) -> Option<Value> {
        self.documents.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// All documents, ordered by id.
    pub async fn documents(&self) -> Vec<Value> {
        self.documents.read().await.values().cloned().collect()
    }
}

fn document_id(document: &Value) -> Result<String, StoreError> {
    document
        .get("_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| StoreError::Rejected("document has no _id".into()))
}

/// Stamp bookkeeping fields the way the content lake does on every write.
fn stamp(mut document: Value, previous: Option<&Value>) -> Value {
    let now = Utc::now().to_rfc3339();
    let created = previous
        .and_then(|p| p.get("_createdAt"))
        .cloned()
        .unwrap_or_else(|| Value::String(now.clone()));
    if let Value::Object(fields) = &mut document {
        fields.insert("_createdAt".into(), created);
        fields.insert("_updatedAt".into(), Value::String(now));
        fields.insert("_rev".into(), Value::String(Uuid::new_v4().simple().to_string()));
    }
    document
}

fn apply_patch(target: &mut Value, patch: &PatchMutation) -> Result<(), StoreError> {
    if let Some(expected) = &patch.if_revision_id {
        if target.get("_rev").and_then(Value::as_str) != Some(expected.as_str()) {
            return Err(StoreError::Rejected(format!(
                "revision mismatch for {}",
                patch.id
            )));
        }
    }
    let Value::Object(fields) = target else {
        return Err(StoreError::Rejected(format!("{} is not an object", patch.id)));
    };
    let ops = &patch.operations;
    if let Some(set_if_missing) = &ops.set_if_missing {
        for (key, value) in set_if_missing {
            fields.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    if let Some(set) = &ops.set {
        for (key, value) in set {
            fields.insert(key.clone(), value.clone());
        }
    }
    if let Some(unset) = &ops.unset {
        for key in unset {
            fields.remove(key);
        }
    }
    Ok(())
}

impl MemoryStore {
    fn check_references(
        &self,
        documents: &BTreeMap<String, Value>,
        document: &Value,
    ) -> Result<(), StoreError> {
        if !self.strict_references {
            return Ok(());
        }
        let Some(fields) = document.as_object() else {
            return Ok(());
        };
        match collect_references(fields)
            .into_iter()
            .find(|r| !documents.contains_key(&r.target_id))
        {
            Some(missing) => Err(StoreError::Rejected(format!(
                "document references non-existent document {}",
                missing.target_id
            ))),
            None => Ok(()),
        }
    }

    fn apply(
        &self,
        documents: &mut BTreeMap<String, Value>,
        mutation: Mutation,
    ) -> Result<MutationResult, StoreError> {
        let (id, operation) = match mutation {
            Mutation::Create(doc) => {
                let id = document_id(&doc)?;
                if documents.contains_key(&id) {
                    return Err(StoreError::Rejected(format!("document {id} already exists")));
                }
                self.check_references(documents, &doc)?;
                documents.insert(id.clone(), stamp(doc, None));
                (id, "create")
            }
            Mutation::CreateOrReplace(doc) => {
                let id = document_id(&doc)?;
                self.check_references(documents, &doc)?;
                let previous = documents.get(&id);
                let operation = if previous.is_some() { "update" } else { "create" };
                let stamped = stamp(doc, previous);
                documents.insert(id.clone(), stamped);
                (id, operation)
            }
            Mutation::CreateIfNotExists(doc) => {
                let id = document_id(&doc)?;
                if documents.contains_key(&id) {
                    (id, "none")
                } else {
                    self.check_references(documents, &doc)?;
                    documents.insert(id.clone(), stamp(doc, None));
                    (id, "create")
                }
            }
            Mutation::Delete(delete) => {
                let operation = if documents.remove(&delete.id).is_some() {
                    "delete"
                } else {
                    "none"
                };
                (delete.id, operation)
            }
            Mutation::Patch(patch) => {
                let mut target = documents
                    .get(&patch.id)
                    .cloned()
                    .ok_or_else(|| StoreError::Rejected(format!("document {} not found", patch.id)))?;
                apply_patch(&mut target, &patch)?;
                self.check_references(documents, &target)?;
                let previous = documents.get(&patch.id);
                let stamped = stamp(target, previous);
                documents.insert(patch.id.clone(), stamped);
                (patch.id, "update")
            }
        };
        Ok(MutationResult {
            id,
            operation: operation.to_string(),
        })
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn describe(&self) -> String {
        "in-memory dataset".to_string()
    }

    async fn fetch(&self, query: &DocumentQuery) -> Result<Vec<Value>, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents
            .values()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect())
    }

    /// All-or-nothing: mutations apply to a scratch copy that replaces the
    /// dataset only when every one succeeds.
    async fn commit(&self, mutations: Vec<Mutation>) -> Result<MutationResponse, StoreError> {
        let mut documents = self.documents.write().await;
        let mut scratch = documents.clone();
        let mut results = Vec::with_capacity(mutations.len());
        for mutation in mutations {
            results.push(self.apply(&mut scratch, mutation)?);
        }
        *documents = scratch;
        Ok(MutationResponse {
            transaction_id: Uuid::new_v4().to_string(),
            results,
        })
    }
}
