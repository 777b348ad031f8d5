//! Runs one submission against a corpus of reference documents.
//!
//! The submitted document is embedded once; every reference document is then
//! compared on its own task, at most `num_workers` at a time. A reference
//! that fails or times out is reported and left out of the results, the rest
//! of the run carries on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::blocks::{Block, group_blocks};
use crate::citation::classify;
use crate::embedding::{Embedder, Embeddings, embed_checked};
use crate::similarity::compare_embedded;
use crate::{ComparisonResult, Config, CoreError, Document};

/// Progress events emitted during a corpus run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A reference document acquired a worker slot.
    Started {
        index: usize,
        total: usize,
        reference: String,
    },
    Completed {
        index: usize,
        total: usize,
        reference: String,
        exact_score: f64,
        partial_score: f64,
    },
    /// The reference was dropped from the run.
    Failed {
        index: usize,
        total: usize,
        reference: String,
        error: String,
    },
    Cancelled {
        index: usize,
        reference: String,
    },
}

/// Outcome for one reference document.
#[derive(Debug, Clone)]
pub struct ReferenceComparison {
    /// Position of the reference in the input list.
    pub index: usize,
    pub result: ComparisonResult,
    pub blocks: Vec<Block>,
}

/// Embed with a deadline.
pub async fn embed_with_timeout(
    embedder: &dyn Embedder,
    sentences: &[String],
    timeout: Duration,
) -> Result<Embeddings, CoreError> {
    match tokio::time::timeout(timeout, embed_checked(embedder, sentences)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(CoreError::Timeout(timeout)),
    }
}

/// Compare one reference document against an already embedded submission:
/// similarity, then citation classification, then block grouping.
pub async fn compare_reference(
    submitted: &Document,
    submitted_embeddings: &Embeddings,
    reference: &Document,
    embedder: &dyn Embedder,
    config: &Config,
) -> Result<ReferenceComparison, CoreError> {
    if submitted.is_empty() || reference.is_empty() {
        return Ok(ReferenceComparison {
            index: 0,
            result: ComparisonResult::unmatched(&reference.name),
            blocks: Vec::new(),
        });
    }

    let reference_embeddings =
        embed_with_timeout(embedder, &reference.sentences, config.embed_timeout()).await?;
    let mut result = compare_embedded(
        &submitted.sentences,
        &reference.sentences,
        submitted_embeddings,
        &reference_embeddings,
        config.thresholds(),
        &reference.name,
    )?;

    classify(
        &mut result.matched_pairs,
        &reference.sentences,
        &reference.raw_lines,
        config.bib_store.as_deref(),
        config.citation_window,
    );
    let blocks = group_blocks(
        &result.matched_pairs,
        &submitted.sentences,
        &reference.sentences,
    );

    Ok(ReferenceComparison {
        index: 0,
        result,
        blocks,
    })
}

/// Compare `submitted` against every document in `references`.
///
/// Results come back in input order. Only a failure to embed the submitted
/// document is an error; per-reference failures surface as
/// [`ProgressEvent::Failed`]. Cancelling `cancel` stops references that have
/// not started yet.
pub async fn compare_corpus(
    submitted: Document,
    references: Vec<Document>,
    embedder: Arc<dyn Embedder>,
    config: Config,
    progress: impl Fn(ProgressEvent) + Send + Sync + 'static,
    cancel: CancellationToken,
) -> Result<Vec<ReferenceComparison>, CoreError> {
    config.validate()?;
    let total = references.len();
    let progress: Arc<dyn Fn(ProgressEvent) + Send + Sync> = Arc::new(progress);

    tracing::info!(
        submitted = %submitted.name,
        sentences = submitted.sentences.len(),
        references = total,
        embedder = embedder.name(),
        "starting comparison run"
    );

    let submitted_embeddings =
        embed_with_timeout(embedder.as_ref(), &submitted.sentences, config.embed_timeout())
            .await?;

    let submitted = Arc::new(submitted);
    let submitted_embeddings = Arc::new(submitted_embeddings);
    let config = Arc::new(config);
    let semaphore = Arc::new(Semaphore::new(config.num_workers));
    let mut join_set = tokio::task::JoinSet::new();

    for (index, reference) in references.into_iter().enumerate() {
        if cancel.is_cancelled() {
            progress(ProgressEvent::Cancelled {
                index,
                reference: reference.name,
            });
            continue;
        }

        let submitted = Arc::clone(&submitted);
        let submitted_embeddings = Arc::clone(&submitted_embeddings);
        let config = Arc::clone(&config);
        let embedder = Arc::clone(&embedder);
        let semaphore = Arc::clone(&semaphore);
        let progress = Arc::clone(&progress);
        let cancel = cancel.clone();

        join_set.spawn(async move {
            let _permit = tokio::select! {
                _ = cancel.cancelled() => return (index, reference.name, None),
                permit = semaphore.acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => return (index, reference.name, None),
                },
            };

            progress(ProgressEvent::Started {
                index,
                total,
                reference: reference.name.clone(),
            });
            let outcome = compare_reference(
                &submitted,
                &submitted_embeddings,
                &reference,
                embedder.as_ref(),
                &config,
            )
            .await;
            (index, reference.name, Some(outcome))
        });
    }

    let mut comparisons = Vec::with_capacity(total);
    while let Some(joined) = join_set.join_next().await {
        let (index, reference, outcome) = match joined {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "comparison task panicked");
                continue;
            }
        };

        match outcome {
            Some(Ok(mut comparison)) => {
                comparison.index = index;
                tracing::debug!(
                    reference = %reference,
                    exact = comparison.result.exact_score,
                    partial = comparison.result.partial_score,
                    blocks = comparison.blocks.len(),
                    "reference compared"
                );
                progress(ProgressEvent::Completed {
                    index,
                    total,
                    reference,
                    exact_score: comparison.result.exact_score,
                    partial_score: comparison.result.partial_score,
                });
                comparisons.push(comparison);
            }
            Some(Err(e)) => {
                tracing::warn!(reference = %reference, error = %e, "reference comparison failed");
                progress(ProgressEvent::Failed {
                    index,
                    total,
                    reference,
                    error: e.to_string(),
                });
            }
            None => progress(ProgressEvent::Cancelled { index, reference }),
        }
    }

    comparisons.sort_by_key(|c| c.index);
    Ok(comparisons)
}
