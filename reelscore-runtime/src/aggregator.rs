//! Score Aggregator
//!
//! Runs every extractor for a title and combines what comes back:
//! - Concurrent mode spawns one task per extractor and settles all of them
//! - Sequential mode runs them in order with a pause in between
//! - Override entries replace a source's lookup entirely

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info};

use reelscore_core::{AggregateResult, OverrideTable, Rating, Scores, Source};
use reelscore_sources::ScoreExtractor;

/// Aggregation failures
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Movie title is required")]
    InvalidTitle,

    #[error("No scores found for {title:?}")]
    Empty { title: String },
}

/// How extractors are scheduled within one query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// All extractors at once
    Concurrent,
    /// One after another, pausing between them
    Sequential { pause: Duration },
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Concurrent
    }
}

/// Aggregator configuration
#[derive(Debug, Clone, Default)]
pub struct AggregatorConfig {
    pub mode: ExecutionMode,
    pub overrides: OverrideTable,
}

/// Combines per-source extractors into one unified score
pub struct Aggregator {
    extractors: Vec<Arc<dyn ScoreExtractor>>,
    mode: ExecutionMode,
    overrides: OverrideTable,
}

impl Aggregator {
    pub fn new(extractors: Vec<Arc<dyn ScoreExtractor>>, config: AggregatorConfig) -> Self {
        info!(
            "Aggregator ready: {} extractors, {:?}, {} override entries",
            extractors.len(),
            config.mode,
            config.overrides.len()
        );
        Self {
            extractors,
            mode: config.mode,
            overrides: config.overrides,
        }
    }

    /// Sources this aggregator can report on
    pub fn sources(&self) -> Vec<Source> {
        self.extractors.iter().map(|e| e.source()).collect()
    }

    /// Score one title
    pub async fn score(&self, title: &str) -> Result<AggregateResult, AggregateError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AggregateError::InvalidTitle);
        }

        info!("Scoring {:?}", title);

        let mut scores = Scores::default();
        let mut overridden = Vec::new();
        if let Some(known) = self.overrides.get(title) {
            for rating in known.present() {
                debug!("Using override for {}: {}", rating.source(), rating);
                scores.set(rating.source(), Some(rating));
                overridden.push(rating.source());
            }
        }

        let pending: Vec<Arc<dyn ScoreExtractor>> = self
            .extractors
            .iter()
            .filter(|e| !overridden.contains(&e.source()))
            .cloned()
            .collect();

        let fetched = match self.mode {
            ExecutionMode::Concurrent => run_concurrent(pending, title).await,
            ExecutionMode::Sequential { pause } => run_sequential(pending, title, pause).await,
        };

        for (source, rating) in fetched {
            scores.set(source, rating);
        }

        match AggregateResult::from_scores(title, scores, overridden) {
            Some(result) => {
                info!(
                    "{:?}: unified {} from {} sources",
                    title, result.unified_score, result.valid_scores
                );
                Ok(result)
            }
            None => {
                info!("{:?}: no source produced a score", title);
                Err(AggregateError::Empty {
                    title: title.to_string(),
                })
            }
        }
    }
}

async fn run_concurrent(extractors: Vec<Arc<dyn ScoreExtractor>>, title: &str) -> Vec<(Source, Option<Rating>)> {
    let sources: Vec<Source> = extractors.iter().map(|e| e.source()).collect();
    let handles = extractors.into_iter().map(|extractor| spawn_extract(extractor, title));

    // Settle all: a failed task only loses its own source
    join_all(handles)
        .await
        .into_iter()
        .zip(sources)
        .map(|(joined, source)| (source, settle(source, joined)))
        .collect()
}

async fn run_sequential(
    extractors: Vec<Arc<dyn ScoreExtractor>>,
    title: &str,
    pause: Duration,
) -> Vec<(Source, Option<Rating>)> {
    let mut results = Vec::with_capacity(extractors.len());

    for (i, extractor) in extractors.into_iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        let source = extractor.source();
        let joined = spawn_extract(extractor, title).await;
        results.push((source, settle(source, joined)));
    }

    results
}

fn spawn_extract(extractor: Arc<dyn ScoreExtractor>, title: &str) -> JoinHandle<Option<Rating>> {
    let title = title.to_string();
    tokio::spawn(async move { extractor.extract(&title).await })
}

fn settle(source: Source, joined: Result<Option<Rating>, JoinError>) -> Option<Rating> {
    match joined {
        Ok(rating) => rating,
        Err(e) => {
            error!("{} extractor task failed: {}", source, e);
            None
        }
    }
}
