//! Mutation types matching Sanity's mutation protocol.
//!
//! Wire form is externally tagged, with create-style mutations carrying the
//! document directly: `{"createOrReplace": {"_id": "...", ...}}`.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mutation {
    Create(Value),
    CreateOrReplace(Value),
    CreateIfNotExists(Value),
    Delete(DeleteMutation),
    Patch(PatchMutation),
}

impl Mutation {
    /// Id of the document this mutation targets, if it names one.
    pub fn document_id(&self) -> Option<&str> {
        match self {
            Mutation::Create(doc) | Mutation::CreateOrReplace(doc) | Mutation::CreateIfNotExists(doc) => {
                doc.get("_id").and_then(Value::as_str)
            }
            Mutation::Delete(delete) => Some(&delete.id),
            Mutation::Patch(patch) => Some(&patch.id),
        }
    }

    /// Patch that replaces the given top-level fields.
    pub fn set_fields(id: impl Into<String>, set: Map<String, Value>) -> Self {
        Mutation::Patch(PatchMutation {
            id: id.into(),
            if_revision_id: None,
            operations: PatchOperations {
                set: Some(set),
                ..PatchOperations::default()
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteMutation {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchMutation {
    pub id: String,
    #[serde(rename = "ifRevisionID", default, skip_serializing_if = "Option::is_none")]
    pub if_revision_id: Option<String>,
    #[serde(flatten)]
    pub operations: PatchOperations,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchOperations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_if_missing: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unset: Option<Vec<String>>,
}

/// Body of a mutate request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationRequest {
    pub mutations: Vec<Mutation>,
}

/// Result of a mutation transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    pub transaction_id: String,
    #[serde(default)]
    pub results: Vec<MutationResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResult {
    pub id: String,
    #[serde(default)]
    pub operation: String,
}
