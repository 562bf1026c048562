//! Batch scoring
//!
//! Scores a list of titles one at a time with a pause between queries, so a
//! long list does not hammer the review sites.

use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use reelscore_core::AggregateResult;

use crate::Aggregator;

/// Outcome for one title in a batch
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    /// 1-based position in the input list
    pub rank: usize,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AggregateResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchEntry {
    pub fn unified_score(&self) -> Option<u32> {
        self.result.as_ref().map(|r| r.unified_score)
    }
}

/// Titles from a list file: one per line, blank lines and `#` comments skipped
pub fn parse_titles(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read a title list file
pub fn load_titles<P: AsRef<Path>>(path: P) -> std::io::Result<Vec<String>> {
    Ok(parse_titles(&std::fs::read_to_string(path)?))
}

/// Score every title in order, pausing between queries.
///
/// `on_entry` sees the entries so far after each title, so callers can
/// checkpoint a long run.
pub async fn run_batch<F>(aggregator: &Aggregator, titles: &[String], pause: Duration, mut on_entry: F) -> Vec<BatchEntry>
where
    F: FnMut(&[BatchEntry]),
{
    let mut entries = Vec::with_capacity(titles.len());

    for (i, title) in titles.iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }

        let rank = i + 1;
        info!("[{}/{}] {}", rank, titles.len(), title);

        let entry = match aggregator.score(title).await {
            Ok(result) => BatchEntry {
                rank,
                title: title.clone(),
                result: Some(result),
                error: None,
            },
            Err(e) => {
                warn!("No result for {:?}: {}", title, e);
                BatchEntry {
                    rank,
                    title: title.clone(),
                    result: None,
                    error: Some(e.to_string()),
                }
            }
        };
        entries.push(entry);
        on_entry(&entries);
    }

    let scored = entries.iter().filter(|e| e.result.is_some()).count();
    info!("Batch complete: {}/{} titles scored", scored, entries.len());
    entries
}

/// Scored entries only, highest unified score first (ties keep input order)
pub fn ranked(entries: &[BatchEntry]) -> Vec<BatchEntry> {
    let mut scored: Vec<BatchEntry> = entries.iter().filter(|e| e.result.is_some()).cloned().collect();
    scored.sort_by(|a, b| b.unified_score().cmp(&a.unified_score()));
    scored
}
