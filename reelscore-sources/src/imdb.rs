//! IMDb extractor

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::{Arc, LazyLock};
use tracing::debug;

use reelscore_core::{Rating, Source};
use reelscore_fetch::{page, ContentKind, PageFetcher};

use crate::cascade::{parse_score, Cascade};
use crate::strategies::{Markers, Pick, StructuredData, TextScan};
use crate::traits::{choose_candidate, Candidate, ExtractError, ExtractorConfig, ScoreExtractor, SearchOutcome};

static RESULT_ITEMS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [".find-result-item", "li.ipc-metadata-list-summary-item", ".findResult"]
        .iter()
        .map(|css| Selector::parse(css).unwrap())
        .collect()
});
static TITLE_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse(r#"a[href*="/title/tt"]"#).unwrap());
static INLINE_RATING: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".ipc-rating-star--imdb").unwrap());

static DECIMAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{1,2}\.\d)\b").unwrap());

/// IMDb user rating extractor (0-10 scale)
pub struct Imdb {
    config: ExtractorConfig,
    fetcher: Arc<dyn PageFetcher>,
    cascade: Cascade,
}

impl Imdb {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_config(fetcher, ExtractorConfig::for_source(Source::Imdb))
    }

    pub fn with_config(fetcher: Arc<dyn PageFetcher>, config: ExtractorConfig) -> Self {
        Self {
            config,
            fetcher,
            cascade: Self::detail_cascade(),
        }
    }

    pub fn with_cascade(mut self, cascade: Cascade) -> Self {
        self.cascade = cascade;
        self
    }

    /// Default title-page cascade
    pub fn detail_cascade() -> Cascade {
        Cascade::new(Source::Imdb)
            .then(
                Markers::numeric()
                    .text(r#"[data-testid="hero-rating-bar__aggregate-rating__score"] span"#)
                    .text(".ipc-rating-star--imdb .ipc-rating-star--rating")
                    .text(r#"span[itemprop="ratingValue"]"#)
                    .text(".imdbRating .ratingValue strong span"),
            )
            .then(StructuredData::new())
            .then(
                TextScan::new(DECIMAL.clone())
                    .label(Regex::new(r"\b(\d{1,2}(?:\.\d)?)\s*/\s*10\b").unwrap())
                    .pick(Pick::First),
            )
    }

    /// Pick a search result and read its inline rating or title link
    pub fn parse_search(&self, html: &str, title: &str) -> SearchOutcome {
        let document = Html::parse_document(html);

        let items: Vec<ElementRef> = RESULT_ITEMS
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|items| !items.is_empty())
            .unwrap_or_default();

        let candidates: Vec<Candidate> = items.into_iter().filter_map(read_item).collect();
        if candidates.is_empty() {
            debug!("No IMDb title results for {:?}", title);
            return SearchOutcome::Miss;
        }

        match choose_candidate(candidates, title, self.config.strict_matching) {
            Some(candidate) => candidate.into_outcome(Source::Imdb, &self.config.site),
            None => SearchOutcome::Miss,
        }
    }
}

/// Items without a title link are people, companies or keywords
fn read_item(item: ElementRef<'_>) -> Option<Candidate> {
    let link = item.select(&TITLE_LINK).next()?;

    let href = link
        .value()
        .attr("href")
        .map(|href| href.split('?').next().unwrap_or(href).to_string());

    let score = item
        .select(&INLINE_RATING)
        .next()
        .map(page::element_text)
        .as_deref()
        .and_then(parse_score);

    Some(Candidate {
        title: page::element_text(link),
        score,
        href,
    })
}

#[async_trait]
impl ScoreExtractor for Imdb {
    fn source(&self) -> Source {
        Source::Imdb
    }

    async fn lookup(&self, title: &str) -> Result<Option<Rating>, ExtractError> {
        let search_url = self.config.site.search_url(title);
        let html = self.fetcher.fetch(&search_url, ContentKind::Html).await?;

        let detail_url = match self.parse_search(&html, title) {
            SearchOutcome::Score(rating) => {
                debug!("IMDb rating from search results: {}", rating);
                return Ok(Some(rating));
            }
            SearchOutcome::Detail(url) => url,
            SearchOutcome::Miss => return Ok(None),
        };

        let html = self.fetcher.fetch(&detail_url, ContentKind::Html).await?;
        Ok(self.cascade.run_html(&html))
    }
}
