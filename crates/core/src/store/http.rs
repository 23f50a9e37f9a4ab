//! Content store backed by the Sanity HTTP data API.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{ContentStore, DocumentQuery, StoreError};
use crate::config::ProjectSettings;
use crate::mutation::types::{Mutation, MutationRequest, MutationResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Value,
}

pub struct HttpStore {
    client: Client,
    base_url: String,
    dataset: String,
    token: Option<String>,
}

impl HttpStore {
    pub fn new(settings: &ProjectSettings) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("content-migrate/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.api_base(),
            dataset: settings.dataset.clone(),
            token: settings.token.clone(),
        })
    }

    fn query_url(&self) -> String {
        format!("{}/data/query/{}", self.base_url, self.dataset)
    }

    fn mutate_url(&self) -> String {
        format!("{}/data/mutate/{}", self.base_url, self.dataset)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Query-string pairs for a query: the GROQ text plus each parameter as
/// `$name=<json>`.
fn query_pairs(query: &DocumentQuery) -> Vec<(String, String)> {
    let mut pairs = vec![("query".to_string(), query.groq())];
    for (name, value) in query.params() {
        pairs.push((format!("${name}"), value.to_string()));
    }
    pairs
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Api {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Pull a readable message out of an API error body.
fn error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    let error = json.get("error");
    let message = [
        error.and_then(|e| e.get("description")),
        error.and_then(|e| e.get("message")),
        json.get("message"),
        error,
    ]
    .into_iter()
    .flatten()
    .find_map(Value::as_str)
    .map(str::to_string)
    .unwrap_or_else(|| body.trim().to_string());
    message
}

#[async_trait]
impl ContentStore for HttpStore {
    fn describe(&self) -> String {
        format!("{} ({})", self.base_url, self.dataset)
    }

    async fn fetch(&self, query: &DocumentQuery) -> Result<Vec<Value>, StoreError> {
        debug!(query = %query.groq(), "fetching documents");
        let request = self.client.get(self.query_url()).query(&query_pairs(query));
        let response = check_status(self.authorized(request).send().await?).await?;
        let body: QueryResponse = response.json().await?;
        match body.result {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(StoreError::Decode(format!(
                "expected an array result, got {other}"
            ))),
        }
    }

    async fn commit(&self, mutations: Vec<Mutation>) -> Result<MutationResponse, StoreError> {
        debug!(count = mutations.len(), "committing mutations");
        let request = self
            .client
            .post(self.mutate_url())
            .query(&[("returnIds", "true")])
            .json(&MutationRequest { mutations });
        let response = check_status(self.authorized(request).send().await?).await?;
        Ok(response.json().await?)
    }
}
