//! Strategy cascade
//!
//! A detail page is handed to an ordered list of strategies. Each strategy
//! proposes candidate values in its own preference order; the cascade takes
//! the first candidate that passes the source's bounds check and stops.

use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;
use tracing::debug;

use reelscore_core::{Rating, Source, RELEASE_YEARS};

/// Any decimal or integer numeral
pub static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").unwrap());

/// One extraction heuristic
pub trait Strategy: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Candidate values, most preferred first
    fn candidates(&self, document: &Html) -> Vec<f64>;
}

/// Ordered strategies for one source
pub struct Cascade {
    source: Source,
    strategies: Vec<Box<dyn Strategy>>,
}

impl Cascade {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            strategies: Vec::new(),
        }
    }

    /// Append a strategy at the lowest priority
    pub fn then<S: Strategy + 'static>(mut self, strategy: S) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Strategy names in priority order
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// First in-bounds candidate across all strategies
    pub fn run(&self, document: &Html) -> Option<Rating> {
        for strategy in &self.strategies {
            for value in strategy.candidates(document) {
                match Rating::new(self.source, value) {
                    Some(rating) => {
                        debug!("{}: {} matched {}", self.source, strategy.name(), rating);
                        return Some(rating);
                    }
                    None => {
                        debug!("{}: {} candidate {} out of bounds", self.source, strategy.name(), value);
                    }
                }
            }
        }

        debug!("{}: no strategy produced a score (tried {:?})", self.source, self.names());
        None
    }

    /// Parse markup and run the cascade
    pub fn run_html(&self, html: &str) -> Option<Rating> {
        let document = Html::parse_document(html);
        self.run(&document)
    }
}

/// First numeral captured by `pattern` (group 1 if present)
pub fn capture_number(pattern: &Regex, text: &str) -> Option<f64> {
    let caps = pattern.captures(text)?;
    let m = caps.get(1).or_else(|| caps.get(0))?;
    m.as_str().trim().parse().ok()
}

/// Every captured numeral, in document order.
///
/// Uses the first participating group of each match, so a pattern may
/// offer alternative label placements.
pub fn capture_all(pattern: &Regex, text: &str) -> Vec<f64> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| {
            let m = caps
                .iter()
                .skip(1)
                .flatten()
                .next()
                .or_else(|| caps.get(0))?;
            m.as_str().trim().parse().ok()
        })
        .collect()
}

/// True for whole numbers that read as a release year
pub fn is_release_year(value: f64) -> bool {
    value.fract() == 0.0 && RELEASE_YEARS.contains(&(value as u32))
}

/// Parse a bare score string such as "87", " 8.8 " or "87%"
pub fn parse_score(text: &str) -> Option<f64> {
    capture_number(&NUMBER, text)
}
