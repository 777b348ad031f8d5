//! Deterministic feature-hashing embedder.
//!
//! Word unigrams and bigrams are hashed (FNV-1a) into a fixed number of
//! buckets and the vector is L2-normalized. Identical sentences map to
//! identical vectors and sentences sharing most of their wording land close
//! together. It has no notion of meaning, so it is a reproducible stand-in
//! for tests, not a paraphrase detector.

use std::future::Future;
use std::pin::Pin;

use super::{EmbedError, Embedder, Embeddings};

/// Default vector width, matching common sentence-transformer models.
pub const DEFAULT_DIMENSION: usize = 384;

const BIGRAM_WEIGHT: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed a single sentence. Text without any word characters maps to the
    /// zero vector.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();

        let mut vector = vec![0.0f32; self.dimension];
        for token in &tokens {
            vector[self.bucket(token.as_bytes())] += 1.0;
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{}\u{1f}{}", pair[0], pair[1]);
            vector[self.bucket(bigram.as_bytes())] += BIGRAM_WEIGHT;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    fn bucket(&self, bytes: &[u8]) -> usize {
        (fnv1a(bytes) % self.dimension as u64) as usize
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn embed<'a>(
        &'a self,
        sentences: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Embeddings, EmbedError>> + Send + 'a>> {
        Box::pin(async move { Ok(sentences.iter().map(|s| self.embed_one(s)).collect()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn identical_text_identical_vectors() {
        let e = HashingEmbedder::default();
        let a = e.embed_one("The quick brown fox jumps.");
        let b = e.embed_one("the QUICK brown fox jumps");
        assert_eq!(a, b);
        assert!((dot(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn related_text_scores_above_unrelated() {
        let e = HashingEmbedder::default();
        let base = e.embed_one("neural networks learn representations from data");
        let close = e.embed_one("neural networks learn useful representations from data");
        let far = e.embed_one("the recipe calls for two cups of flour");
        assert!(dot(&base, &close) > dot(&base, &far));
        assert!(dot(&base, &close) > 0.8);
    }

    #[test]
    fn punctuation_only_is_zero_vector() {
        let e = HashingEmbedder::new(16);
        assert!(e.embed_one("-- ...").iter().all(|v| *v == 0.0));
    }

    #[test]
    fn zero_dimension_is_clamped() {
        assert_eq!(HashingEmbedder::new(0).dimension(), 1);
    }

    #[tokio::test]
    async fn embed_returns_one_row_per_sentence() {
        let e = HashingEmbedder::new(32);
        let sentences = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let rows = e.embed(&sentences).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.len() == 32));
    }
}
