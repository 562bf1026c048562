//! Common traits for score extractors

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use reelscore_core::{best_match, Rating, Site, Source};
use reelscore_fetch::FetchError;

/// Errors from extractor operations. Never escape [`ScoreExtractor::extract`].
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Network error: {0}")]
    Network(#[from] FetchError),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Common interface for all review-site extractors
#[async_trait]
pub trait ScoreExtractor: Send + Sync {
    /// Source this extractor reports for
    fn source(&self) -> Source;

    /// Look the title up, surfacing failures
    async fn lookup(&self, title: &str) -> Result<Option<Rating>, ExtractError>;

    /// Look the title up; every failure collapses to `None`
    async fn extract(&self, title: &str) -> Option<Rating> {
        match self.lookup(title).await {
            Ok(Some(rating)) => {
                info!("{} score for {:?}: {}", self.source(), title, rating);
                Some(rating)
            }
            Ok(None) => {
                debug!("{} has no score for {:?}", self.source(), title);
                None
            }
            Err(e) => {
                warn!("{} lookup for {:?} failed: {}", self.source(), title, e);
                None
            }
        }
    }
}

/// Per-extractor configuration
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Site endpoints
    pub site: Site,
    /// Require a title match among search results instead of falling back
    /// to the site's top result
    pub strict_matching: bool,
}

impl ExtractorConfig {
    pub fn for_source(source: Source) -> Self {
        Self {
            site: Site::default_for(source),
            strict_matching: false,
        }
    }

    pub fn with_site(mut self, site: Site) -> Self {
        self.site = site;
        self
    }

    pub fn strict(mut self, strict_matching: bool) -> Self {
        self.strict_matching = strict_matching;
        self
    }
}

/// What a search page yielded
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Score read straight from the result list
    Score(Rating),
    /// Absolute URL of the chosen result's detail page
    Detail(String),
    /// Nothing usable
    Miss,
}

/// A search result entry, as much as could be read of it
#[derive(Debug, Clone, Default)]
pub struct Candidate {
    pub title: String,
    pub score: Option<f64>,
    pub href: Option<String>,
}

impl Candidate {
    /// Turn the chosen candidate into a search outcome
    pub fn into_outcome(self, source: Source, site: &Site) -> SearchOutcome {
        if let Some(rating) = self.score.and_then(|v| Rating::new(source, v)) {
            return SearchOutcome::Score(rating);
        }
        match self.href {
            Some(href) => SearchOutcome::Detail(site.resolve(&href)),
            None => SearchOutcome::Miss,
        }
    }
}

/// Pick the result for `query`: the first title match, else the site's top
/// result unless `strict`.
pub fn choose_candidate(mut candidates: Vec<Candidate>, query: &str, strict: bool) -> Option<Candidate> {
    if candidates.is_empty() {
        return None;
    }

    match best_match(candidates.iter().map(|c| c.title.as_str()), query) {
        Some(idx) => Some(candidates.swap_remove(idx)),
        None if strict => {
            debug!("No search result matches {:?}", query);
            None
        }
        None => Some(candidates.swap_remove(0)),
    }
}
