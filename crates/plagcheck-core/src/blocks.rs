//! Grouping of matched pairs into contiguous plagiarism blocks.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::MatchedPair;

/// A run of consecutive submitted sentences that all matched something in
/// the same reference document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub submitted_indices: Vec<usize>,
    /// Distinct reference indices touched by the run, ascending.
    pub reference_indices: Vec<usize>,
    pub submitted_text: String,
    pub reference_text: String,
    pub avg_similarity: f64,
}

/// Split `pairs` (already sorted by submitted index) into maximal runs whose
/// submitted indices increase by exactly one.
fn consecutive_runs<'a>(pairs: &[&'a MatchedPair]) -> Vec<Vec<&'a MatchedPair>> {
    let mut runs: Vec<Vec<&MatchedPair>> = Vec::new();
    for &pair in pairs {
        let extends = runs
            .last()
            .and_then(|run| run.last())
            .is_some_and(|prev| prev.submitted_index + 1 == pair.submitted_index);
        match runs.last_mut() {
            Some(run) if extends => run.push(pair),
            _ => runs.push(vec![pair]),
        }
    }
    runs
}

fn join_indexed(sentences: &[String], indices: impl IntoIterator<Item = usize>) -> String {
    indices
        .into_iter()
        .filter_map(|i| sentences.get(i).map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Group matched pairs into blocks of consecutive submitted sentences.
///
/// Pairs are sorted by submitted index first, so input order does not
/// matter. Blocks come back in submitted order.
pub fn group_blocks(pairs: &[MatchedPair], submitted: &[String], reference: &[String]) -> Vec<Block> {
    let mut sorted: Vec<&MatchedPair> = pairs.iter().collect();
    sorted.sort_by_key(|p| p.submitted_index);

    consecutive_runs(&sorted)
        .into_iter()
        .map(|run| {
            let submitted_indices: Vec<usize> = run.iter().map(|p| p.submitted_index).collect();
            let reference_indices: Vec<usize> = run
                .iter()
                .map(|p| p.reference_index)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let avg_similarity =
                run.iter().map(|p| p.similarity).sum::<f64>() / run.len() as f64;

            Block {
                submitted_text: join_indexed(submitted, submitted_indices.iter().copied()),
                reference_text: join_indexed(reference, reference_indices.iter().copied()),
                submitted_indices,
                reference_indices,
                avg_similarity,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CitationStatus, MatchType};

    fn pair(i: usize, j: usize, sim: f64) -> MatchedPair {
        MatchedPair {
            submitted_index: i,
            submitted_sentence: format!("s{i}"),
            reference_index: j,
            reference_sentence: format!("r{j}"),
            similarity: sim,
            match_type: MatchType::Partial,
            source_file: "ref".into(),
            citation_status: CitationStatus::Uncited,
            citation_text: String::new(),
        }
    }

    fn sentences(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn splits_into_maximal_runs() {
        let pairs = vec![
            pair(2, 5, 0.9),
            pair(3, 6, 0.8),
            pair(4, 6, 1.0),
            pair(7, 1, 0.85),
            pair(8, 0, 0.95),
        ];
        let blocks = group_blocks(&pairs, &sentences("s", 10), &sentences("r", 10));

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].submitted_indices, vec![2, 3, 4]);
        assert_eq!(blocks[0].reference_indices, vec![5, 6]);
        assert_eq!(blocks[0].submitted_text, "s2 s3 s4");
        assert_eq!(blocks[0].reference_text, "r5 r6");
        assert!((blocks[0].avg_similarity - 0.9).abs() < 1e-9);

        assert_eq!(blocks[1].submitted_indices, vec![7, 8]);
        assert_eq!(blocks[1].reference_indices, vec![0, 1]);
        assert_eq!(blocks[1].reference_text, "r0 r1");
        assert!((blocks[1].avg_similarity - 0.9).abs() < 1e-9);
    }

    #[test]
    fn unsorted_input_is_sorted_first() {
        let pairs = vec![pair(8, 0, 0.9), pair(7, 0, 0.9), pair(2, 0, 0.9)];
        let blocks = group_blocks(&pairs, &sentences("s", 10), &sentences("r", 1));
        let runs: Vec<_> = blocks.iter().map(|b| b.submitted_indices.clone()).collect();
        assert_eq!(runs, vec![vec![2], vec![7, 8]]);
    }

    #[test]
    fn empty_pairs_give_no_blocks() {
        assert!(group_blocks(&[], &[], &[]).is_empty());
    }
}
