//! Embedding provider backed by an OpenAI-compatible `/embeddings` endpoint.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{EmbedError, Embedder, Embeddings};

/// Inputs per request; larger documents are sent in several batches.
pub const DEFAULT_BATCH_SIZE: usize = 128;

pub struct HttpEmbedder {
    base_url: String,
    model: String,
    api_key: Option<String>,
    batch_size: usize,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// `base_url` is the API root, e.g. `http://localhost:8080/v1`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: Duration::from_secs(30),
            client,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Embeddings, EmbedError> {
        let mut request = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: batch,
            });
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbedError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| EmbedError::Malformed(e.to_string()))?;
        order_rows(parsed.data, batch.len())
    }
}

/// Put rows back in request order; providers may return them shuffled.
fn order_rows(mut data: Vec<EmbeddingDatum>, expected: usize) -> Result<Embeddings, EmbedError> {
    if data.len() != expected {
        return Err(EmbedError::Malformed(format!(
            "expected {} embeddings, got {}",
            expected,
            data.len()
        )));
    }
    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index);
        if data
            .iter()
            .enumerate()
            .any(|(i, d)| d.index != Some(i))
        {
            return Err(EmbedError::Malformed("embedding indices are not 0..n".into()));
        }
    }
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

impl Embedder for HttpEmbedder {
    fn name(&self) -> &str {
        &self.model
    }

    fn embed<'a>(
        &'a self,
        sentences: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Embeddings, EmbedError>> + Send + 'a>> {
        Box::pin(async move {
            let mut rows = Vec::with_capacity(sentences.len());
            for batch in sentences.chunks(self.batch_size) {
                rows.extend(self.embed_batch(batch).await?);
            }
            tracing::debug!(model = %self.model, rows = rows.len(), "embedded sentences");
            Ok(rows)
        })
    }
}
