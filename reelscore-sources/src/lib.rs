//! reelscore sources
//!
//! One extractor per review site:
//! - **Rotten Tomatoes**: Tomatometer percentage (0-100)
//! - **Metacritic**: Metascore (0-100), JSON search endpoint first
//! - **IMDb**: user rating (0-10, one decimal)
//!
//! Each extractor searches the site, picks the result matching the title,
//! and reads the score from the result list or the detail page. Detail
//! pages go through a [`Cascade`] of strategies so a layout change on the
//! site degrades to a fallback instead of a miss.

pub mod cascade;
pub mod strategies;
pub mod traits;
pub mod rotten_tomatoes;
pub mod metacritic;
pub mod imdb;

pub use cascade::*;
pub use strategies::*;
pub use traits::*;
pub use rotten_tomatoes::*;
pub use metacritic::*;
pub use imdb::*;

use std::sync::Arc;

use reelscore_core::{Site, Source};
use reelscore_fetch::PageFetcher;

/// One extractor per registry entry, in the order given, sharing one fetcher
pub fn site_extractors(
    fetcher: Arc<dyn PageFetcher>,
    sites: Vec<Site>,
    strict_matching: bool,
) -> Vec<Arc<dyn ScoreExtractor>> {
    sites
        .into_iter()
        .map(|site| {
            let source = site.source;
            let config = ExtractorConfig::for_source(source).with_site(site).strict(strict_matching);
            let extractor: Arc<dyn ScoreExtractor> = match source {
                Source::RottenTomatoes => Arc::new(RottenTomatoes::with_config(fetcher.clone(), config)),
                Source::Metacritic => Arc::new(Metacritic::with_config(fetcher.clone(), config)),
                Source::Imdb => Arc::new(Imdb::with_config(fetcher.clone(), config)),
            };
            extractor
        })
        .collect()
}
