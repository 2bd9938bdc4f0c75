//! Reference corpus (the user's library)
//!
//! Records arrive either flat (`{"abstractText", "dateAdded"}`) or as Zotero
//! items (`{"data": {"abstractNote", "dateAdded", ...}}`).

use chrono::NaiveDateTime;
use paperrank_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Timestamp format for `dateAdded`; the trailing `Z` is literal
pub const DATE_ADDED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One paper from the user's library
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CorpusEntry {
    #[serde(alias = "abstractNote", default)]
    pub abstract_text: String,

    pub date_added: String,
}

impl CorpusEntry {
    pub fn new(abstract_text: impl Into<String>, date_added: impl Into<String>) -> Self {
        Self {
            abstract_text: abstract_text.into(),
            date_added: date_added.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CorpusRecord {
    Zotero { data: CorpusEntry },
    Flat(CorpusEntry),
}

impl From<CorpusRecord> for CorpusEntry {
    fn from(record: CorpusRecord) -> Self {
        match record {
            CorpusRecord::Zotero { data } => data,
            CorpusRecord::Flat(entry) => entry,
        }
    }
}

/// Parse a `dateAdded` value; `index` is reported on failure
pub fn parse_date_added(index: usize, value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, DATE_ADDED_FORMAT).map_err(|_| AppError::InvalidTimestamp {
        index,
        value: value.to_string(),
    })
}

/// Sort the corpus newest first.
///
/// Every timestamp is parsed before sorting so a malformed entry fails the
/// whole call. The sort is stable: entries added at the same second keep
/// their input order.
pub fn sort_newest_first(corpus: &[CorpusEntry]) -> Result<Vec<&CorpusEntry>> {
    let mut dated = corpus
        .iter()
        .enumerate()
        .map(|(i, entry)| parse_date_added(i, &entry.date_added).map(|ts| (ts, entry)))
        .collect::<Result<Vec<_>>>()?;

    dated.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(dated.into_iter().map(|(_, entry)| entry).collect())
}

/// Parse a JSON array of corpus records, dropping entries without an abstract
pub fn parse_corpus(json: &str) -> Result<Vec<CorpusEntry>> {
    let records: Vec<CorpusRecord> = serde_json::from_str(json)?;
    let total = records.len();

    let corpus: Vec<CorpusEntry> = records
        .into_iter()
        .map(CorpusEntry::from)
        .filter(|entry| !entry.abstract_text.trim().is_empty())
        .collect();

    if corpus.len() < total {
        debug!(dropped = total - corpus.len(), "Skipped corpus entries without abstract");
    }
    Ok(corpus)
}

/// Load a corpus JSON file
pub async fn load_corpus(path: impl AsRef<Path>) -> Result<Vec<CorpusEntry>> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path).await?;
    let corpus = parse_corpus(&json)?;
    info!(path = %path.display(), papers = corpus.len(), "Loaded corpus");
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_and_zotero_records() {
        let json = r#"[
            {"abstractText": "quantum computing", "dateAdded": "2024-01-01T00:00:00Z"},
            {"key": "ABCD1234", "data": {"title": "Mechanics", "abstractNote": "classical mechanics", "dateAdded": "2023-01-01T00:00:00Z"}}
        ]"#;
        let corpus = parse_corpus(json).unwrap();

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus[0], CorpusEntry::new("quantum computing", "2024-01-01T00:00:00Z"));
        assert_eq!(corpus[1], CorpusEntry::new("classical mechanics", "2023-01-01T00:00:00Z"));
    }

    #[test]
    fn test_entries_without_abstract_are_dropped() {
        let json = r#"[
            {"data": {"abstractNote": "", "dateAdded": "2024-01-01T00:00:00Z"}},
            {"data": {"dateAdded": "2024-01-02T00:00:00Z"}},
            {"data": {"abstractNote": "kept", "dateAdded": "2024-01-03T00:00:00Z"}}
        ]"#;
        let corpus = parse_corpus(json).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus[0].abstract_text, "kept");
    }

    #[test]
    fn test_parse_date_added() {
        assert!(parse_date_added(0, "2024-01-01T12:30:45Z").is_ok());

        for bad in ["2024-01-01", "2024-01-01T00:00:00", "2024-01-01T00:00:00+00:00", ""] {
            let err = parse_date_added(4, bad).unwrap_err();
            assert!(
                matches!(err, AppError::InvalidTimestamp { index: 4, ref value } if value == bad),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_sort_newest_first() {
        let corpus = vec![
            CorpusEntry::new("old", "2020-05-01T00:00:00Z"),
            CorpusEntry::new("new", "2024-05-01T00:00:00Z"),
            CorpusEntry::new("mid", "2022-05-01T00:00:00Z"),
        ];
        let sorted: Vec<&str> = sort_newest_first(&corpus)
            .unwrap()
            .into_iter()
            .map(|e| e.abstract_text.as_str())
            .collect();
        assert_eq!(sorted, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_timestamps() {
        let corpus = vec![
            CorpusEntry::new("first", "2024-01-01T00:00:00Z"),
            CorpusEntry::new("newest", "2024-06-01T00:00:00Z"),
            CorpusEntry::new("second", "2024-01-01T00:00:00Z"),
        ];
        let sorted: Vec<&str> = sort_newest_first(&corpus)
            .unwrap()
            .into_iter()
            .map(|e| e.abstract_text.as_str())
            .collect();
        assert_eq!(sorted, vec!["newest", "first", "second"]);
    }

    #[test]
    fn test_sort_reports_malformed_index() {
        let corpus = vec![
            CorpusEntry::new("ok", "2024-01-01T00:00:00Z"),
            CorpusEntry::new("bad", "01/02/2024"),
        ];
        let err = sort_newest_first(&corpus).unwrap_err();
        assert!(matches!(err, AppError::InvalidTimestamp { index: 1, .. }));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = load_corpus("/nonexistent/corpus.json").await.unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
