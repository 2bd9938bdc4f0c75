//! Recency weights for a newest-first corpus
//!
//! `raw[i] = 1 / (1 + log10(i + 1) / 2)`, normalized to sum to one. The
//! newest entry (index 0) always gets the largest share and the decay is
//! logarithmic, so old papers still count.

use paperrank_common::errors::{AppError, Result};

/// Normalized recency weights for `n` corpus entries.
///
/// Fails with `EmptyCorpus` when `n == 0`.
pub fn recency_weights(n: usize) -> Result<Vec<f32>> {
    if n == 0 {
        return Err(AppError::EmptyCorpus);
    }

    let raw: Vec<f64> = (0..n)
        .map(|i| 1.0 / (1.0 + ((i + 1) as f64).log10() / 2.0))
        .collect();
    let total: f64 = raw.iter().sum();

    Ok(raw.into_iter().map(|w| (w / total) as f32).collect())
}
