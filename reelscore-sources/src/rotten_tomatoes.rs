//! Rotten Tomatoes extractor
//!
//! Search rows usually carry the Tomatometer inline as an attribute, so most
//! lookups finish after one request. Otherwise the movie page is fetched and
//! run through the detail cascade.

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

/// Search result containers, most specific first
static RESULT_ROWS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["search-page-media-row", r#"[data-qa="search-result"]"#, r#"a[href*="/m/"]"#]
        .iter()
        .map(|css| Selector::parse(css).unwrap())
        .collect()
});
static ROW_TITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[data-qa="info-name"], [slot="title"], [data-qa="search-result-title"]"#).unwrap()
});
static MOVIE_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse(r#"a[href*="/m/"]"#).unwrap());

static PERCENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{1,3})\s*%").unwrap());

/// Rotten Tomatoes Tomatometer extractor
pub struct RottenTomatoes {
    config: ExtractorConfig,
    fetcher: Arc<dyn PageFetcher>,
    cascade: Cascade,
}

impl RottenTomatoes {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_config(fetcher, ExtractorConfig::for_source(Source::RottenTomatoes))
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
        Cascade::new(Source::RottenTomatoes)
            .then(
                Markers::new(PERCENT.clone())
                    .attr("score-board[tomatometerscore]", "tomatometerscore")
                    .attr("score-board-deprecated[tomatometerscore]", "tomatometerscore")
                    .text(r#"rt-text[slot="criticsScore"]"#)
                    .text(r#"[data-qa="tomatometer"]"#)
                    .text(".tomatometer .percentage")
                    .text(".score .percentage")
                    .text(".tomatometer")
                    .text(".score"),
            )
            .then(StructuredData::new())
            .then(
                TextScan::new(PERCENT.clone())
                    .label(Regex::new(r"(?i)\b(\d{1,3})\s*%\s*tomatometer|tomatometer\s*(\d{1,3})\s*%").unwrap())
                    .pick(Pick::Max),
            )
    }

    /// Pick a search row and read its inline score or detail link
    pub fn parse_search(&self, html: &str, title: &str) -> SearchOutcome {
        let document = Html::parse_document(html);

        let rows: Vec<ElementRef> = RESULT_ROWS
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|rows| !rows.is_empty())
            .unwrap_or_default();

        if rows.is_empty() {
            debug!("No Rotten Tomatoes search results for {:?}", title);
            return SearchOutcome::Miss;
        }

        let candidates = rows.into_iter().map(read_row).collect();
        match choose_candidate(candidates, title, self.config.strict_matching) {
            Some(candidate) => candidate.into_outcome(Source::RottenTomatoes, &self.config.site),
            None => SearchOutcome::Miss,
        }
    }
}

fn read_row(row: ElementRef<'_>) -> Candidate {
    let element = row.value();

    let title = row
        .select(&ROW_TITLE)
        .next()
        .map(page::element_text)
        .or_else(|| element.attr("title").map(str::to_string))
        .unwrap_or_else(|| page::element_text(row));

    let score = element.attr("tomatometerscore").and_then(parse_score);

    let href = element
        .attr("url")
        .or_else(|| (element.name() == "a").then(|| element.attr("href")).flatten())
        .or_else(|| row.select(&MOVIE_LINK).next().and_then(|a| a.value().attr("href")))
        .map(str::to_string);

    Candidate { title, score, href }
}

#[async_trait]
impl ScoreExtractor for RottenTomatoes {
    fn source(&self) -> Source {
        Source::RottenTomatoes
    }

    async fn lookup(&self, title: &str) -> Result<Option<Rating>, ExtractError> {
        let search_url = self.config.site.search_url(title);
        let html = self.fetcher.fetch(&search_url, ContentKind::Html).await?;

        let detail_url = match self.parse_search(&html, title) {
            SearchOutcome::Score(rating) => {
                debug!("Rotten Tomatoes score from search results: {}", rating);
                return Ok(Some(rating));
            }
            SearchOutcome::Detail(url) => url,
            SearchOutcome::Miss => return Ok(None),
        };

        let html = self.fetcher.fetch(&detail_url, ContentKind::Html).await?;
        Ok(self.cascade.run_html(&html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelscore_fetch::FixtureFetcher;

    const SEARCH_URL: &str = "https://www.rottentomatoes.com/search?search=Inception";
    const MOVIE_URL: &str = "https://www.rottentomatoes.com/m/inception";

    const SEARCH_WITH_SCORE: &str = r#"
        <search-page-result type="movie">
          <search-page-media-row tomatometerscore="73" url="https://www.rottentomatoes.com/m/interstellar_2014">
            <a data-qa="info-name" href="/m/interstellar_2014">Interstellar</a>
          </search-page-media-row>
          <search-page-media-row tomatometerscore="87" url="https://www.rottentomatoes.com/m/inception">
            <a data-qa="info-name" href="/m/inception">Inception</a>
          </search-page-media-row>
        </search-page-result>
    "#;

    const SEARCH_WITHOUT_SCORE: &str = r#"
        <search-page-media-row tomatometerscore="" url="/m/inception">
          <a data-qa="info-name" href="/m/inception">Inception</a>
        </search-page-media-row>
    "#;

    fn extractor(fetcher: FixtureFetcher) -> (RottenTomatoes, Arc<FixtureFetcher>) {
        let fetcher = Arc::new(fetcher);
        (RottenTomatoes::new(fetcher.clone()), fetcher)
    }

    #[tokio::test]
    async fn test_fast_path_from_search_row() {
        let (rt, fetcher) = extractor(FixtureFetcher::new().with_page(SEARCH_URL, SEARCH_WITH_SCORE));

        let rating = rt.extract("Inception").await.unwrap();
        assert_eq!(rating.value(), 87.0);
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test]
    async fn test_title_match_picks_row() {
        let (rt, _) = extractor(FixtureFetcher::new());
        let outcome = rt.parse_search(SEARCH_WITH_SCORE, "interstellar");
        assert!(matches!(outcome, SearchOutcome::Score(r) if r.value() == 73.0));

        // No match: the site's top result wins unless matching is strict
        let outcome = rt.parse_search(SEARCH_WITH_SCORE, "Memento");
        assert!(matches!(outcome, SearchOutcome::Score(r) if r.value() == 73.0));

        let strict = RottenTomatoes::with_config(
            Arc::new(FixtureFetcher::new()),
            ExtractorConfig::for_source(Source::RottenTomatoes).strict(true),
        );
        assert_eq!(strict.parse_search(SEARCH_WITH_SCORE, "Memento"), SearchOutcome::Miss);
    }

    #[tokio::test]
    async fn test_detail_page_markers() {
        let detail = r#"<html><body>
            <score-board-deprecated tomatometerscore="87" audiencescore="91"></score-board-deprecated>
        </body></html>"#;
        let (rt, fetcher) = extractor(
            FixtureFetcher::new()
                .with_page(SEARCH_URL, SEARCH_WITHOUT_SCORE)
                .with_page(MOVIE_URL, detail),
        );

        assert_eq!(rt.extract("Inception").await.map(|r| r.value()), Some(87.0));
        assert_eq!(fetcher.requests(), vec![SEARCH_URL, MOVIE_URL]);
    }

    #[tokio::test]
    async fn test_detail_page_text_fallback() {
        let detail = r#"<html><body>
            <div class="hero"><h1>Inception</h1><p>Released 2010</p>
            <p>Audience 91%</p><p>87% Tomatometer 364 Reviews</p></div>
        </body></html>"#;
        let (rt, _) = extractor(
            FixtureFetcher::new()
                .with_page(SEARCH_URL, SEARCH_WITHOUT_SCORE)
                .with_page(MOVIE_URL, detail),
        );

        assert_eq!(rt.extract("Inception").await.map(|r| r.value()), Some(87.0));
    }

    #[tokio::test]
    async fn test_out_of_range_inline_score_ignored() {
        let search = r#"<search-page-media-row tomatometerscore="150" url="/m/inception">
            <a data-qa="info-name">Inception</a></search-page-media-row>"#;
        let detail = r#"<div data-qa="tomatometer">150%</div><div class="score">86%</div>"#;
        let (rt, _) = extractor(
            FixtureFetcher::new()
                .with_page(SEARCH_URL, search)
                .with_page(MOVIE_URL, detail),
        );

        assert_eq!(rt.extract("Inception").await.map(|r| r.value()), Some(86.0));
    }

    #[tokio::test]
    async fn test_custom_cascade() {
        let detail = r#"<div class="critics"><b>91</b></div><div class="score">86%</div>"#;
        let fetcher = Arc::new(
            FixtureFetcher::new()
                .with_page(SEARCH_URL, SEARCH_WITHOUT_SCORE)
                .with_page(MOVIE_URL, detail),
        );
        let rt = RottenTomatoes::new(fetcher)
            .with_cascade(Cascade::new(Source::RottenTomatoes).then(Markers::numeric().text(".critics b")));

        assert_eq!(rt.extract("Inception").await.map(|r| r.value()), Some(91.0));
    }

    #[tokio::test]
    async fn test_fallback_link_rows() {
        let search = r#"<ul><li><a href="/m/inception?ref=search">Inception</a></li></ul>"#;
        let (rt, _) = extractor(FixtureFetcher::new());
        assert_eq!(
            rt.parse_search(search, "Inception"),
            SearchOutcome::Detail("https://www.rottentomatoes.com/m/inception?ref=search".to_string())
        );
    }

    #[tokio::test]
    async fn test_no_results_is_absent() {
        let (rt, fetcher) = extractor(FixtureFetcher::new().with_page(SEARCH_URL, "<p>No results</p>"));
        assert!(rt.extract("Inception").await.is_none());
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test]
    async fn test_network_failure_is_absent() {
        let (rt, _) = extractor(FixtureFetcher::new().with_status(SEARCH_URL, 503));
        assert!(rt.extract("Inception").await.is_none());
        assert!(matches!(rt.lookup("Inception").await, Err(ExtractError::Network(_))));
    }
}
