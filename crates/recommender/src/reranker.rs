//! Embedding-based reranker
//!
//! Each candidate is scored by its cosine similarity to every paper in the
//! user's library, weighted towards recently added papers:
//!
//! ```text
//! score[c] = 10 * Σ_j cos(candidate[c], corpus[j]) * weight[j]
//! ```
//!
//! Scores are only meaningful relative to each other.

use crate::candidate::{sort_by_score, CandidatePaper};
use crate::corpus::{sort_newest_first, CorpusEntry};
use crate::matrix::Matrix;
use crate::weights::recency_weights;
use paperrank_common::config::{EmbeddingConfig, ZeroVectorPolicy};
use paperrank_common::embeddings::{create_embedder_for, Embedder};
use paperrank_common::errors::{AppError, Result, VectorSide};
use paperrank_common::metrics::{self, Timer};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Fixed multiplier applied to the weighted similarity
pub const SCORE_SCALE: f32 = 10.0;

/// Scores candidates against a corpus with a shared embedding model
pub struct Reranker {
    embedder: Arc<dyn Embedder>,
    zero_vector_policy: ZeroVectorPolicy,
}

impl Reranker {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            zero_vector_policy: ZeroVectorPolicy::default(),
        }
    }

    /// Resolve `model_name` through the embedding registry
    pub fn from_registry(model_name: &str, config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self::new(create_embedder_for(model_name, config)?))
    }

    pub fn with_zero_vector_policy(mut self, policy: ZeroVectorPolicy) -> Self {
        self.zero_vector_policy = policy;
        self
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Score `candidates` against `corpus`.
    ///
    /// Scores are written into `candidates` in place; the returned vector
    /// holds the same papers ordered best-first, ties in input order.
    #[instrument(skip_all, fields(model = %self.embedder.model_name(), candidates = candidates.len(), corpus = corpus.len()))]
    pub async fn rerank(
        &self,
        candidates: &mut [CandidatePaper],
        corpus: &[CorpusEntry],
    ) -> Result<Vec<CandidatePaper>> {
        if corpus.is_empty() {
            return Err(AppError::EmptyCorpus);
        }

        let _timer = Timer::start(metrics::RERANK_DURATION).with_label("model", self.model_name());
        ::metrics::counter!(metrics::RERANK_RUNS).increment(1);

        let sorted = sort_newest_first(corpus)?;
        let weights = recency_weights(sorted.len())?;

        if candidates.is_empty() {
            debug!("No candidates to score");
            return Ok(Vec::new());
        }
        ::metrics::histogram!(metrics::RERANK_CANDIDATES).record(candidates.len() as f64);

        let corpus_texts: Vec<String> = sorted.iter().map(|e| e.abstract_text.clone()).collect();
        let candidate_texts: Vec<String> = candidates.iter().map(|c| c.summary.clone()).collect();

        let (corpus_rows, candidate_rows) = tokio::try_join!(
            self.embed(&corpus_texts),
            self.embed(&candidate_texts),
        )?;

        let dimension = self.embedder.dimension();
        let mut corpus_matrix = Matrix::from_rows(corpus_rows, dimension)?;
        let mut candidate_matrix = Matrix::from_rows(candidate_rows, dimension)?;

        let degenerate_corpus = corpus_matrix.normalize_rows(VectorSide::Corpus, self.zero_vector_policy)?;
        let degenerate_candidates =
            candidate_matrix.normalize_rows(VectorSide::Candidate, self.zero_vector_policy)?;
        let degenerate_rows = degenerate_corpus.len() + degenerate_candidates.len();
        if degenerate_rows > 0 {
            ::metrics::counter!(metrics::RERANK_DEGENERATE_ROWS).increment(degenerate_rows as u64);
        }

        let similarity = candidate_matrix.matmul_transpose(&corpus_matrix)?;
        let scores = similarity.weighted_row_sums(&weights, SCORE_SCALE)?;

        for (candidate, score) in candidates.iter_mut().zip(scores) {
            candidate.score = Some(score);
        }

        let mut ranked = candidates.to_vec();
        sort_by_score(&mut ranked);

        info!(
            top_score = ranked.first().and_then(|c| c.score),
            degenerate_corpus = ?degenerate_corpus,
            degenerate_candidates = ?degenerate_candidates,
            "Reranked candidates"
        );
        Ok(ranked)
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let rows = self.embedder.embed_batch(texts).await?;
        if rows.len() != texts.len() {
            return Err(AppError::LengthMismatch {
                what: "embedding rows",
                expected: texts.len(),
                actual: rows.len(),
            });
        }
        Ok(rows)
    }
}

/// Rerank with an embedder resolved from `model_name`
pub async fn rerank_papers(
    candidates: &mut [CandidatePaper],
    corpus: &[CorpusEntry],
    model_name: &str,
    config: &EmbeddingConfig,
) -> Result<Vec<CandidatePaper>> {
    Reranker::from_registry(model_name, config)?
        .rerank(candidates, corpus)
        .await
}
