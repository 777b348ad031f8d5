//! Embedding provider trait and implementations.
//!
//! The similarity engine never reaches for a global model: an [`Embedder`] is
//! injected by the caller, created once and reused across comparisons.

pub mod hashing;
pub mod http;
#[cfg(feature = "fastembed")]
pub mod local;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub use hashing::HashingEmbedder;
pub use http::HttpEmbedder;
#[cfg(feature = "fastembed")]
pub use local::FastEmbedder;

/// One row per input sentence, all rows the same width.
pub type Embeddings = Vec<Vec<f32>>;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("embedding service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed embedding response: {0}")]
    Malformed(String),
    #[error("local embedding model error: {0}")]
    Model(String),
}

/// A provider that maps sentences to fixed-width vectors.
///
/// Implementations must be deterministic for identical input and return
/// exactly one row per sentence.
pub trait Embedder: Send + Sync {
    /// Model or provider identifier, for logs.
    fn name(&self) -> &str;

    fn embed<'a>(
        &'a self,
        sentences: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Embeddings, EmbedError>> + Send + 'a>>;
}

/// Check that `embeddings` has one row per sentence and a stable width.
pub fn validate_embeddings(sentences: &[String], embeddings: &Embeddings) -> Result<(), EmbedError> {
    if embeddings.len() != sentences.len() {
        return Err(EmbedError::Malformed(format!(
            "expected {} rows, got {}",
            sentences.len(),
            embeddings.len()
        )));
    }
    if let Some(first) = embeddings.first() {
        let width = first.len();
        if let Some((i, row)) = embeddings
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != width)
        {
            return Err(EmbedError::Malformed(format!(
                "row {} has width {}, expected {}",
                i,
                row.len(),
                width
            )));
        }
    }
    Ok(())
}

/// Embed `sentences`, skipping the provider entirely for empty input and
/// validating the shape of whatever comes back.
pub async fn embed_checked(
    embedder: &dyn Embedder,
    sentences: &[String],
) -> Result<Embeddings, EmbedError> {
    if sentences.is_empty() {
        return Ok(Vec::new());
    }
    let embeddings = embedder.embed(sentences).await?;
    validate_embeddings(sentences, &embeddings)?;
    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ShortEmbedder;

    impl Embedder for ShortEmbedder {
        fn name(&self) -> &str {
            "short"
        }

        fn embed<'a>(
            &'a self,
            _sentences: &'a [String],
        ) -> Pin<Box<dyn Future<Output = Result<Embeddings, EmbedError>> + Send + 'a>> {
            Box::pin(async { Ok(vec![vec![1.0, 0.0]]) })
        }
    }

    #[test]
    fn validate_rejects_row_count_mismatch() {
        let sentences = vec!["a".to_string(), "b".to_string()];
        let err = validate_embeddings(&sentences, &vec![vec![1.0]]).unwrap_err();
        assert!(matches!(err, EmbedError::Malformed(_)));
    }

    #[test]
    fn validate_rejects_ragged_rows() {
        let sentences = vec!["a".to_string(), "b".to_string()];
        let err = validate_embeddings(&sentences, &vec![vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[tokio::test]
    async fn embed_checked_skips_empty_input() {
        let out = embed_checked(&ShortEmbedder, &[]).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn embed_checked_surfaces_malformed_provider() {
        let sentences = vec!["a".to_string(), "b".to_string()];
        let err = embed_checked(&ShortEmbedder, &sentences).await.unwrap_err();
        assert!(matches!(err, EmbedError::Malformed(_)));
    }
}
