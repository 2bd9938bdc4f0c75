//! PaperRank Recommender
//!
//! Scores arXiv candidates against a user's library:
//! - Corpus loading (Zotero export or flat records) and chronological sort
//! - Recency weights over the sorted corpus
//! - Batched embedding of corpus abstracts and candidate summaries
//! - Cosine similarity matrix with weighted aggregation
//! - Optional LLM TL;DR for the top recommendations

pub mod candidate;
pub mod corpus;
pub mod digest;
pub mod matrix;
pub mod reranker;
pub mod weights;

pub use candidate::CandidatePaper;
pub use corpus::CorpusEntry;
pub use reranker::{rerank_papers, Reranker, SCORE_SCALE};
pub use weights::recency_weights;
