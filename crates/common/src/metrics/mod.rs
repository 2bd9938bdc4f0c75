//! Metrics names and helpers
//!
//! Recorded through the `metrics` facade. Without an installed recorder the
//! macros are no-ops, so library code records unconditionally.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all PaperRank metrics
pub const METRICS_PREFIX: &str = "paperrank";

pub const RERANK_RUNS: &str = "paperrank_rerank_runs_total";
pub const RERANK_DURATION: &str = "paperrank_rerank_duration_seconds";
pub const RERANK_CANDIDATES: &str = "paperrank_rerank_candidates";
pub const RERANK_DEGENERATE_ROWS: &str = "paperrank_rerank_degenerate_rows_total";
pub const EMBEDDING_REQUESTS: &str = "paperrank_embedding_requests_total";
pub const EMBEDDING_TEXTS: &str = "paperrank_embedding_texts_total";
pub const EMBEDDING_DURATION: &str = "paperrank_embedding_duration_seconds";
pub const EMBEDDING_ERRORS: &str = "paperrank_embedding_errors_total";
pub const LLM_REQUESTS: &str = "paperrank_llm_requests_total";
pub const LLM_DURATION: &str = "paperrank_llm_duration_seconds";
pub const RETRY_FAILURES: &str = "paperrank_retry_failures_total";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(RERANK_RUNS, Unit::Count, "Total rerank invocations");
    describe_histogram!(RERANK_DURATION, Unit::Seconds, "End-to-end rerank latency in seconds");
    describe_histogram!(RERANK_CANDIDATES, Unit::Count, "Candidates scored per rerank call");
    describe_counter!(RERANK_DEGENERATE_ROWS, Unit::Count, "Zero-norm embeddings scored as similarity 0");

    describe_counter!(EMBEDDING_REQUESTS, Unit::Count, "Total embedding requests");
    describe_counter!(EMBEDDING_TEXTS, Unit::Count, "Total texts sent for embedding");
    describe_histogram!(EMBEDDING_DURATION, Unit::Seconds, "Embedding request latency in seconds");
    describe_counter!(EMBEDDING_ERRORS, Unit::Count, "Total embedding request errors");

    describe_counter!(LLM_REQUESTS, Unit::Count, "Total LLM generate calls");
    describe_histogram!(LLM_DURATION, Unit::Seconds, "LLM generation latency in seconds");
    describe_counter!(RETRY_FAILURES, Unit::Count, "Failed attempts inside retry loops");
}

/// Timer that records a histogram observation when dropped
pub struct Timer {
    name: &'static str,
    labels: Vec<(&'static str, String)>,
    start: Instant,
}

impl Timer {
    /// Start timing a histogram
    pub fn start(name: &'static str) -> Self {
        Self {
            name,
            labels: Vec::new(),
            start: Instant::now(),
        }
    }

    /// Attach a label to the recorded observation
    pub fn with_label(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.labels.push((key, value.into()));
        self
    }

    /// Elapsed time in seconds so far
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let labels: Vec<metrics::Label> = self
            .labels
            .iter()
            .map(|(k, v)| metrics::Label::new(*k, v.clone()))
            .collect();
        histogram!(self.name, labels).record(self.elapsed_secs());
    }
}

/// Record an embedding request for a model
pub fn record_embedding_request(model: &str, texts: usize) {
    counter!(EMBEDDING_REQUESTS, "model" => model.to_string()).increment(1);
    counter!(EMBEDDING_TEXTS, "model" => model.to_string()).increment(texts as u64);
}

/// Record an embedding failure for a model
pub fn record_embedding_error(model: &str) {
    counter!(EMBEDDING_ERRORS, "model" => model.to_string()).increment(1);
}
