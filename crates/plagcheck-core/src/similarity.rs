//! Sentence-level semantic matching against one reference document.
//!
//! Each submitted sentence is matched greedily to its single most similar
//! reference sentence (argmax, ties to the lowest column). No global
//! assignment is attempted, so several submitted sentences may share one
//! reference sentence.

use crate::embedding::{Embedder, Embeddings, embed_checked, validate_embeddings};
use crate::{CitationStatus, ComparisonResult, CoreError, MatchType, MatchedPair};

/// Guards the cosine denominator against zero-norm rows.
pub const EPSILON: f64 = f64::EPSILON;

/// Similarity cut-offs for classifying a best match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// At or above: exact.
    pub exact: f64,
    /// At or above (and below `exact`): partial.
    pub partial: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            exact: 0.95,
            partial: 0.80,
        }
    }
}

impl Thresholds {
    pub fn classify(&self, similarity: f64) -> Option<MatchType> {
        if similarity >= self.exact {
            Some(MatchType::Exact)
        } else if similarity >= self.partial {
            Some(MatchType::Partial)
        } else {
            None
        }
    }
}

fn norm(row: &[f32]) -> f64 {
    row.iter().map(|v| f64::from(*v) * f64::from(*v)).sum::<f64>().sqrt()
}

/// Pairwise cosine similarities: rows follow `a`, columns follow `b`.
///
/// `sim[i][j] = a_i · b_j / ((|a_i| + ε)(|b_j| + ε))`
pub fn cosine_similarity_matrix(a: &[Vec<f32>], b: &[Vec<f32>]) -> Vec<Vec<f64>> {
    let b_norms: Vec<f64> = b.iter().map(|row| norm(row) + EPSILON).collect();
    a.iter()
        .map(|a_row| {
            let a_norm = norm(a_row) + EPSILON;
            b.iter()
                .zip(&b_norms)
                .map(|(b_row, b_norm)| {
                    let dot: f64 = a_row
                        .iter()
                        .zip(b_row)
                        .map(|(x, y)| f64::from(*x) * f64::from(*y))
                        .sum();
                    dot / (a_norm * b_norm)
                })
                .collect()
        })
        .collect()
}

/// Index and value of the row maximum; the first occurrence wins ties.
pub fn best_match(row: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (j, &value) in row.iter().enumerate() {
        match best {
            Some((_, current)) if !(value > current) => {}
            _ => best = Some((j, value)),
        }
    }
    best
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Classify every submitted sentence against precomputed embeddings.
///
/// Citation fields of the returned pairs are left at their defaults for the
/// classifier to fill in.
pub fn compare_embedded(
    submitted: &[String],
    reference: &[String],
    submitted_embeddings: &Embeddings,
    reference_embeddings: &Embeddings,
    thresholds: Thresholds,
    reference_name: &str,
) -> Result<ComparisonResult, CoreError> {
    let total = submitted.len();
    if total == 0 {
        return Ok(ComparisonResult::unmatched(reference_name));
    }
    validate_embeddings(submitted, submitted_embeddings)?;
    validate_embeddings(reference, reference_embeddings)?;

    let matrix = cosine_similarity_matrix(submitted_embeddings, reference_embeddings);

    let mut exact_matches = Vec::new();
    let mut partial_matches = Vec::new();
    let mut matched_pairs = Vec::new();
    let mut unique_count = 0usize;

    for ((i, sentence), row) in submitted.iter().enumerate().zip(&matrix) {
        let classified = best_match(row)
            .and_then(|(j, sim)| thresholds.classify(sim).map(|t| (j, sim, t)));
        let Some((j, similarity, match_type)) = classified else {
            unique_count += 1;
            continue;
        };

        match match_type {
            MatchType::Exact => exact_matches.push(sentence.clone()),
            MatchType::Partial => partial_matches.push(sentence.clone()),
        }
        matched_pairs.push(MatchedPair {
            submitted_index: i,
            submitted_sentence: sentence.clone(),
            reference_index: j,
            reference_sentence: reference[j].clone(),
            similarity,
            match_type,
            source_file: reference_name.to_string(),
            citation_status: CitationStatus::Uncited,
            citation_text: String::new(),
        });
    }

    let n = total as f64;
    Ok(ComparisonResult {
        filename: reference_name.to_string(),
        exact_score: round4(exact_matches.len() as f64 / n),
        partial_score: round4(partial_matches.len() as f64 / n),
        unique_score: round4(unique_count as f64 / n),
        total_score: 1.0,
        exact_matches,
        partial_matches,
        matched_pairs,
    })
}

/// Embed both documents with `embedder` and compare them.
///
/// Empty inputs never reach the provider: an empty submission or reference
/// yields the all-unique result. Provider failures are returned to the
/// caller.
pub async fn compare(
    submitted: &[String],
    reference: &[String],
    embedder: &dyn Embedder,
    thresholds: Thresholds,
    reference_name: &str,
) -> Result<ComparisonResult, CoreError> {
    if submitted.is_empty() || reference.is_empty() {
        return Ok(ComparisonResult::unmatched(reference_name));
    }
    let submitted_embeddings = embed_checked(embedder, submitted).await?;
    let reference_embeddings = embed_checked(embedder, reference).await?;
    compare_embedded(
        submitted,
        reference,
        &submitted_embeddings,
        &reference_embeddings,
        thresholds,
        reference_name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cosine_matrix_basic() {
        let a = vec![vec![1.0, 0.0], vec![0.0, 2.0]];
        let b = vec![vec![3.0, 0.0], vec![1.0, 1.0]];
        let m = cosine_similarity_matrix(&a, &b);
        assert!((m[0][0] - 1.0).abs() < 1e-9);
        assert!(m[1][0].abs() < 1e-9);
        assert!((m[1][1] - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn cosine_matrix_zero_row_is_zero() {
        let m = cosine_similarity_matrix(&[vec![0.0, 0.0]], &[vec![0.0, 0.0], vec![1.0, 0.0]]);
        assert_eq!(m, vec![vec![0.0, 0.0]]);
    }

    #[test]
    fn best_match_first_index_wins_ties() {
        assert_eq!(best_match(&[0.2, 0.9, 0.9, 0.1]), Some((1, 0.9)));
        assert_eq!(best_match(&[]), None);
    }

    #[test]
    fn best_match_skips_nan() {
        assert_eq!(best_match(&[0.5, f64::NAN, 0.7]), Some((2, 0.7)));
    }

    #[test]
    fn thresholds_boundaries() {
        let t = Thresholds::default();
        assert_eq!(t.classify(0.95), Some(MatchType::Exact));
        assert_eq!(t.classify(0.9499), Some(MatchType::Partial));
        assert_eq!(t.classify(0.80), Some(MatchType::Partial));
        assert_eq!(t.classify(0.7999), None);
    }

    #[test]
    fn compare_embedded_classifies_rows() {
        let submitted = strings(&["s0", "s1", "s2"]);
        let reference = strings(&["r0", "r1"]);
        // s0 == r1 exactly, s1 at 0.85 to r0, s2 orthogonal to both.
        let sub = vec![
            vec![0.0, 1.0, 0.0],
            vec![0.85, (1.0f32 - 0.85 * 0.85).sqrt(), 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        let refs = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
        let r = compare_embedded(&submitted, &reference, &sub, &refs, Thresholds::default(), "ref.txt")
            .unwrap();

        assert_eq!(r.exact_matches, vec!["s0"]);
        assert_eq!(r.partial_matches, vec!["s1"]);
        assert_eq!(r.matched_pairs.len(), 2);
        assert_eq!(r.matched_pairs[0].reference_index, 1);
        assert_eq!(r.matched_pairs[0].match_type, MatchType::Exact);
        assert_eq!(r.matched_pairs[1].reference_index, 0);
        assert_eq!(r.matched_pairs[1].source_file, "ref.txt");
        assert_eq!(r.exact_score, 0.3333);
        assert_eq!(r.partial_score, 0.3333);
        assert_eq!(r.unique_score, 0.3333);
        assert_eq!(r.total_score, 1.0);
        assert!((r.exact_score + r.partial_score + r.unique_score - 1.0).abs() < 1e-3);
    }

    #[test]
    fn compare_embedded_rejects_shape_mismatch() {
        let submitted = strings(&["a", "b"]);
        let err = compare_embedded(
            &submitted,
            &strings(&["r"]),
            &vec![vec![1.0]],
            &vec![vec![1.0]],
            Thresholds::default(),
            "r",
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Embedding(_)));
    }

    #[tokio::test]
    async fn compare_self_is_fully_exact() {
        let doc = strings(&[
            "Plagiarism detection compares sentences.",
            "Embeddings capture meaning.",
            "Blocks group contiguous matches.",
        ]);
        let r = compare(&doc, &doc, &HashingEmbedder::default(), Thresholds::default(), "self")
            .await
            .unwrap();
        assert_eq!(r.exact_score, 1.0);
        assert_eq!(r.partial_score, 0.0);
        assert_eq!(r.unique_score, 0.0);
        for (i, pair) in r.matched_pairs.iter().enumerate() {
            assert_eq!(pair.reference_index, i);
        }
    }

    #[tokio::test]
    async fn compare_empty_submission_is_degenerate() {
        let r = compare(&[], &strings(&["x"]), &HashingEmbedder::default(), Thresholds::default(), "ref")
            .await
            .unwrap();
        assert_eq!(r.unique_score, 1.0);
        assert_eq!(r.exact_score, 0.0);
        assert!(r.matched_pairs.is_empty());
    }

    #[tokio::test]
    async fn compare_empty_reference_is_all_unique() {
        let r = compare(&strings(&["x y z"]), &[], &HashingEmbedder::default(), Thresholds::default(), "ref")
            .await
            .unwrap();
        assert_eq!(r.unique_score, 1.0);
        assert!(r.exact_matches.is_empty());
        assert!(r.partial_matches.is_empty());
    }
}
