#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use content_migrate_core::config::{ProjectSettings, SourceConfig};
use content_migrate_core::document::reference::has_reference_fields;
use content_migrate_core::mutation::types::{Mutation, MutationRequest, MutationResponse};
use content_migrate_core::store::MemoryStore;
use content_migrate_core::{ContentStore, ContentType, DocumentQuery, StoreError, StoreProvider};

/// A store call as seen by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Fetch(DocumentQuery),
    Write { id: String, with_references: bool },
}

/// Memory-backed store that records every call and fails on demand.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    calls: Mutex<Vec<Call>>,
    failing_types: HashSet<ContentType>,
    /// Reject any write that still carries reference fields.
    reject_references: bool,
    /// Reject every write of these ids.
    failing_ids: HashSet<String>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: impl IntoIterator<Item = Value>) -> Self {
        Self {
            inner: MemoryStore::with_documents(documents),
            ..Self::default()
        }
    }

    pub fn failing_type(mut self, doc_type: ContentType) -> Self {
        self.failing_types.insert(doc_type);
        self
    }

    pub fn failing_all_types(mut self) -> Self {
        self.failing_types.extend(ContentType::IMPORT_ORDER);
        self
    }

    pub fn rejecting_references(mut self) -> Self {
        self.reject_references = true;
        self
    }

    pub fn failing_id(mut self, id: &str) -> Self {
        self.failing_ids.insert(id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<(String, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Write { id, with_references } => Some((id, with_references)),
                Call::Fetch(_) => None,
            })
            .collect()
    }

    pub fn write_ids(&self) -> Vec<String> {
        self.writes().into_iter().map(|(id, _)| id).collect()
    }
}

#[async_trait]
impl ContentStore for RecordingStore {
    fn describe(&self) -> String {
        "recording store".to_string()
    }

    async fn fetch(&self, query: &DocumentQuery) -> Result<Vec<Value>, StoreError> {
        self.calls.lock().unwrap().push(Call::Fetch(query.clone()));
        if let DocumentQuery::OfType(doc_type) = query {
            if self.failing_types.contains(doc_type) {
                return Err(StoreError::Api {
                    status: 400,
                    message: format!("unknown type {doc_type}"),
                });
            }
        }
        self.inner.fetch(query).await
    }

    async fn commit(&self, mutations: Vec<Mutation>) -> Result<MutationResponse, StoreError> {
        for mutation in &mutations {
            let id = mutation.document_id().unwrap_or_default().to_string();
            let with_references = match mutation {
                Mutation::CreateOrReplace(doc) => doc.as_object().is_some_and(has_reference_fields),
                _ => false,
            };
            self.calls.lock().unwrap().push(Call::Write {
                id: id.clone(),
                with_references,
            });
            if self.failing_ids.contains(&id) {
                return Err(StoreError::Rejected(format!("{id} is poisoned")));
            }
            if self.reject_references && with_references {
                return Err(StoreError::Rejected(format!("{id} references a missing document")));
            }
        }
        self.inner.commit(mutations).await
    }
}

/// Hands out fixed stores and counts how often it was asked.
pub struct FixedProvider {
    pub sources: HashMap<String, Arc<dyn ContentStore>>,
    pub target: Arc<dyn ContentStore>,
    pub opened: AtomicUsize,
}

impl FixedProvider {
    pub fn new(target: Arc<dyn ContentStore>) -> Self {
        Self {
            sources: HashMap::new(),
            target,
            opened: AtomicUsize::new(0),
        }
    }

    pub fn source(mut self, project_id: &str, store: Arc<dyn ContentStore>) -> Self {
        self.sources.insert(project_id.to_string(), store);
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl StoreProvider for FixedProvider {
    fn source_store(&self, source: &SourceConfig) -> Result<Arc<dyn ContentStore>, StoreError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.sources
            .get(&source.project.project_id)
            .cloned()
            .ok_or_else(|| StoreError::Decode(format!("no such project {}", source.project.project_id)))
    }

    fn target_store(&self, _target: &ProjectSettings) -> Result<Arc<dyn ContentStore>, StoreError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(self.target.clone())
    }
}

impl StoreProvider for &FixedProvider {
    fn source_store(&self, source: &SourceConfig) -> Result<Arc<dyn ContentStore>, StoreError> {
        (**self).source_store(source)
    }

    fn target_store(&self, target: &ProjectSettings) -> Result<Arc<dyn ContentStore>, StoreError> {
        (**self).target_store(target)
    }
}

/// Fake content lake speaking the query/mutate HTTP API, one memory store per
/// dataset.
#[derive(Clone)]
pub struct FakeLake {
    pub datasets: Arc<HashMap<String, Arc<MemoryStore>>>,
    pub token: String,
    pub seen_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, description: impl Into<String>) -> ApiError {
    (status, Json(json!({"error": {"description": description.into()}})))
}

impl FakeLake {
    pub fn new(token: &str, datasets: impl IntoIterator<Item = (&'static str, Arc<MemoryStore>)>) -> Self {
        Self {
            datasets: Arc::new(
                datasets
                    .into_iter()
                    .map(|(name, store)| (name.to_string(), store))
                    .collect(),
            ),
            token: token.to_string(),
            seen_queries: Arc::default(),
        }
    }

    fn dataset(&self, name: &str) -> Result<Arc<MemoryStore>, ApiError> {
        self.datasets
            .get(name)
            .cloned()
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("dataset {name} not found")))
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/{version}/data/query/{dataset}", get(query))
            .route("/{version}/data/mutate/{dataset}", post(mutate))
            .with_state(self)
    }

    /// Serve on an ephemeral port; returns the base URL.
    pub async fn spawn(self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = self.router();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }
}

async fn query(
    State(lake): State<FakeLake>,
    Path((_version, dataset)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    lake.seen_queries.lock().unwrap().push(params.clone());
    let store = lake.dataset(&dataset)?;

    let param = |name: &str| -> Option<String> {
        params
            .get(name)
            .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
            .and_then(|v| v.as_str().map(str::to_string))
    };
    let parsed = if let Some(doc_type) = param("$type") {
        ContentType::parse(&doc_type).map(DocumentQuery::OfType)
    } else {
        param("$site")
            .and_then(|site| content_migrate_core::SiteTag::parse(&site).ok())
            .map(DocumentQuery::SiteReferences)
    };
    let Some(parsed) = parsed else {
        return Err(api_error(StatusCode::BAD_REQUEST, "unsupported query"));
    };

    let result = store
        .fetch(&parsed)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(json!({ "ms": 1, "query": params.get("query"), "result": result })))
}

async fn mutate(
    State(lake): State<FakeLake>,
    Path((_version, dataset)): Path<(String, String)>,
    headers: HeaderMap,
    Json(request): Json<MutationRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let expected = format!("Bearer {}", lake.token);
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return Err(api_error(StatusCode::UNAUTHORIZED, "Session not found"));
    }

    let store = lake.dataset(&dataset)?;
    store
        .commit(request.mutations)
        .await
        .map(Json)
        .map_err(|e| api_error(StatusCode::CONFLICT, e.to_string()))
}

pub fn settings_for(base_url: &str, dataset: &str, token: Option<&str>) -> ProjectSettings {
    let mut settings = ProjectSettings::new("fake-project");
    settings.api_host = Some(base_url.to_string());
    settings.dataset = dataset.to_string();
    settings.token = token.map(str::to_string);
    settings
}
