//! Candidate papers under evaluation

use paperrank_common::errors::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use tracing::info;

/// A newly published paper to be scored against the corpus
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CandidatePaper {
    #[serde(default)]
    pub arxiv_id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub authors: Vec<String>,

    /// Abstract text; this is what gets embedded
    pub summary: String,

    #[serde(default)]
    pub url: String,

    /// Relevance score, written by the reranker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,

    /// One-sentence summary produced by the digest step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tldr: Option<String>,
}

impl CandidatePaper {
    /// Candidate with only a summary, mostly for tests and quick scoring
    pub fn from_summary(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }
}

fn by_score_desc(a: &CandidatePaper, b: &CandidatePaper) -> Ordering {
    match (a.score, b.score) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort, highest score first; unscored papers go last
pub fn sort_by_score(papers: &mut [CandidatePaper]) {
    papers.sort_by(by_score_desc);
}

/// Parse a JSON array of candidates
pub fn parse_candidates(json: &str) -> Result<Vec<CandidatePaper>> {
    Ok(serde_json::from_str(json)?)
}

/// Load a candidates JSON file
pub async fn load_candidates(path: impl AsRef<Path>) -> Result<Vec<CandidatePaper>> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path).await?;
    let candidates = parse_candidates(&json)?;
    info!(path = %path.display(), papers = candidates.len(), "Loaded candidates");
    Ok(candidates)
}
