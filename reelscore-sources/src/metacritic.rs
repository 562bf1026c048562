//! Metacritic extractor
//!
//! Lookup order:
//! 1. JSON search endpoint (hit list with inline Metascore)
//! 2. HTML search page (score from the result card text)
//! 3. Movie page, found via the chosen result or guessed from the title slug

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use reelscore_core::{slugify, Rating, Source};
use reelscore_fetch::{page, ContentKind, PageFetcher};

use crate::cascade::{capture_all, is_release_year, Cascade};
use crate::strategies::{json_number, Markers, Pick, StructuredData, TextScan};
use crate::traits::{choose_candidate, Candidate, ExtractError, ExtractorConfig, ScoreExtractor, SearchOutcome};

static RESULT_ITEMS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        ".c-pageSiteSearch-results-item",
        ".search-result",
        ".result",
        r#"a[href*="/movie/"]"#,
    ]
    .iter()
    .map(|css| Selector::parse(css).unwrap())
    .collect()
});
static MOVIE_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse(r#"a[href*="/movie/"]"#).unwrap());
static ANY_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

static BARE_SCORE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{1,3})$").unwrap());
static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{1,4})\b").unwrap());

/// Metacritic Metascore extractor
pub struct Metacritic {
    config: ExtractorConfig,
    fetcher: Arc<dyn PageFetcher>,
    cascade: Cascade,
}

impl Metacritic {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_config(fetcher, ExtractorConfig::for_source(Source::Metacritic))
    }

    pub fn with_config(fetcher: Arc<dyn PageFetcher>, config: ExtractorConfig) -> Self {
        Self {
            config,
            fetcher,
            cascade: Self::detail_cascade(),
        }
    }

    /// Replace the movie-page cascade
    pub fn with_cascade(mut self, cascade: Cascade) -> Self {
        self.cascade = cascade;
        self
    }

    /// Default movie-page cascade
    pub fn detail_cascade() -> Cascade {
        Cascade::new(Source::Metacritic)
            .then(
                Markers::numeric()
                    .text(".c-productScoreInfo_scoreNumber span")
                    .text(".ms_wrapper .c-siteReviewScore")
                    .text(".c-siteReviewScore")
                    .text(".c-metascore")
                    .text(".metascore_w.larger.movie")
                    .text(".metascore_w")
                    .text(".metascore"),
            )
            .then(StructuredData::new().key("metaScore").key("metascore"))
            .then(
                TextScan::new(INTEGER.clone())
                    .within(".c-productHero")
                    .within(".c-productScoreInfo")
                    .within(".ms_wrapper")
                    .label(Regex::new(r"(?i)\b(\d{1,3})\s*metascore|metascore\s*:?\s*(\d{1,3})\b").unwrap())
                    .pick(Pick::Max),
            )
    }

    /// Read the JSON search endpoint's hit list
    pub fn parse_api(&self, body: &str, title: &str) -> Result<SearchOutcome, ExtractError> {
        let value: Value = serde_json::from_str(body).map_err(|e| ExtractError::Parse(e.to_string()))?;

        let candidates: Vec<Candidate> = if let Some(hits) = value.get("hits").and_then(Value::as_array) {
            hits.iter()
                .map(|hit| Candidate {
                    title: json_str(hit, "title"),
                    score: hit.get("metaScore").and_then(json_number),
                    href: hit.get("url").and_then(Value::as_str).map(str::to_string),
                })
                .collect()
        } else if let Some(items) = value.pointer("/data/items").and_then(Value::as_array) {
            items
                .iter()
                .map(|item| Candidate {
                    title: json_str(item, "title"),
                    score: item.pointer("/criticScoreSummary/score").and_then(json_number),
                    href: item
                        .get("slug")
                        .and_then(Value::as_str)
                        .map(|slug| format!("/movie/{}/", slug)),
                })
                .collect()
        } else {
            Vec::new()
        };

        Ok(match choose_candidate(candidates, title, self.config.strict_matching) {
            Some(candidate) => candidate.into_outcome(Source::Metacritic, &self.config.site),
            None => SearchOutcome::Miss,
        })
    }

    /// Pick a result card from the HTML search page
    pub fn parse_search(&self, html: &str, title: &str) -> SearchOutcome {
        let document = Html::parse_document(html);

        let items: Vec<ElementRef> = RESULT_ITEMS
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|items| !items.is_empty())
            .unwrap_or_default();

        let candidates = items.into_iter().map(read_item).collect();
        match choose_candidate(candidates, title, self.config.strict_matching) {
            Some(candidate) => candidate.into_outcome(Source::Metacritic, &self.config.site),
            None => SearchOutcome::Miss,
        }
    }

    /// Guessed movie page for a title
    pub fn slug_url(&self, title: &str) -> String {
        self.config.site.resolve(&format!("/movie/{}/", slugify(title)))
    }

    async fn search(&self, title: &str) -> SearchOutcome {
        if let Some(api_url) = self.config.site.api_url(title) {
            match self.fetcher.fetch(&api_url, ContentKind::Json).await {
                Ok(body) => match self.parse_api(&body, title) {
                    Ok(SearchOutcome::Miss) => debug!("Metacritic API had no usable hit for {:?}", title),
                    Ok(outcome) => return outcome,
                    Err(e) => debug!("Metacritic API response unreadable: {}", e),
                },
                Err(e) => debug!("Metacritic API failed, falling back to search page: {}", e),
            }
        }

        let search_url = self.config.site.search_url(title);
        match self.fetcher.fetch(&search_url, ContentKind::Html).await {
            Ok(html) => self.parse_search(&html, title),
            Err(e) => {
                debug!("Metacritic search page failed: {}", e);
                SearchOutcome::Miss
            }
        }
    }
}

fn json_str(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn read_item(item: ElementRef<'_>) -> Candidate {
    let lines = page::text_lines(item);
    let title = lines.first().cloned().unwrap_or_default();

    // The score is usually the card's last line; otherwise take the largest
    // non-year numeral on the card
    let score = lines
        .last()
        .and_then(|line| BARE_SCORE.captures(line))
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .filter(|v| *v <= 100.0)
        .or_else(|| {
            capture_all(&INTEGER, &lines.join(" "))
                .into_iter()
                .filter(|v| !is_release_year(*v) && *v <= 100.0)
                .reduce(f64::max)
        });

    let element = item.value();
    let href = if element.name() == "a" {
        element.attr("href")
    } else {
        item.select(&MOVIE_LINK)
            .next()
            .or_else(|| item.select(&ANY_LINK).next())
            .and_then(|a| a.value().attr("href"))
    }
    .map(str::to_string);

    Candidate { title, score, href }
}

#[async_trait]
impl ScoreExtractor for Metacritic {
    fn source(&self) -> Source {
        Source::Metacritic
    }

    async fn lookup(&self, title: &str) -> Result<Option<Rating>, ExtractError> {
        let detail_url = match self.search(title).await {
            SearchOutcome::Score(rating) => {
                debug!("Metacritic score from search results: {}", rating);
                return Ok(Some(rating));
            }
            SearchOutcome::Detail(url) => url,
            SearchOutcome::Miss => self.slug_url(title),
        };

        let html = self.fetcher.fetch(&detail_url, ContentKind::Html).await?;
        Ok(self.cascade.run_html(&html))
    }
}
