//! HTTP embedding provider speaking the common `POST /embeddings` shape.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{EmbeddingProvider, EmbeddingVector, ProviderError};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: EmbeddingVector,
}

/// Provider backed by an OpenAI-style embeddings endpoint.
///
/// Rows are re-ordered by their `index` field, so a service that answers
/// out of order still yields input-aligned vectors. Transport-level retry
/// and rate limiting are the remote service's concern; any failed request
/// surfaces as a [`ProviderError`] for the calling batch.
#[derive(Clone, Debug)]
pub struct HttpEmbeddingProvider {
    client: Client,
    endpoint: Url,
    model: String,
    api_key: Option<String>,
    label: String,
}

impl HttpEmbeddingProvider {
    /// Creates a provider posting to `endpoint` for the given model.
    pub fn new(endpoint: Url, model: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(concat!("vellum/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        let model = model.into();
        let label = format!("http:{model}");
        Ok(Self {
            client,
            endpoint,
            model,
            api_key: None,
            label,
        })
    }

    /// Attaches a bearer token to every request.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn id(&self) -> &str {
        &self.label
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, ProviderError> {
        let mut request = self.client.post(self.endpoint.clone()).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transport(format!(
                "embedding endpoint returned {status}: {body}"
            )));
        }

        let payload: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Malformed(err.to_string()))?;
        if payload.data.len() != texts.len() {
            return Err(ProviderError::LengthMismatch {
                expected: texts.len(),
                actual: payload.data.len(),
            });
        }

        let mut rows = payload.data;
        rows.sort_by_key(|row| row.index);
        Ok(rows.into_iter().map(|row| row.embedding).collect())
    }
}
