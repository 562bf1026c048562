//! Explicit score overrides
//!
//! Loads known scores for specific titles from a TOML file. Overrides are a
//! labelled data source: the aggregator reports which sources were taken
//! from here instead of scraped.
//!
//! ```toml
//! [[title]]
//! name = "The Shawshank Redemption"
//! rotten_tomatoes = 89
//! metacritic = 82
//! imdb = 9.3
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::{normalize, Rating, Scores, Source};

/// Errors from loading an override file
#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("Failed to read override file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid override file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Override for {title:?} has out-of-range {provider} value {value}")]
    OutOfBounds {
        title: String,
        provider: Source,
        value: f64,
    },
}

#[derive(Debug, Deserialize)]
struct OverrideFile {
    #[serde(default)]
    title: Vec<OverrideEntry>,
}

#[derive(Debug, Deserialize)]
struct OverrideEntry {
    name: String,
    rotten_tomatoes: Option<f64>,
    metacritic: Option<f64>,
    imdb: Option<f64>,
}

/// Known scores keyed by normalized title
#[derive(Debug, Default, Clone)]
pub struct OverrideTable {
    entries: HashMap<String, Scores>,
}

impl OverrideTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self, OverrideError> {
        let file: OverrideFile = toml::from_str(content)?;
        let mut table = Self::new();

        for entry in file.title {
            let mut scores = Scores::default();
            let values = [
                (Source::RottenTomatoes, entry.rotten_tomatoes),
                (Source::Metacritic, entry.metacritic),
                (Source::Imdb, entry.imdb),
            ];

            for (source, value) in values {
                let Some(value) = value else { continue };
                let rating = Rating::new(source, value).ok_or_else(|| OverrideError::OutOfBounds {
                    title: entry.name.clone(),
                    provider: source,
                    value,
                })?;
                scores.set(source, Some(rating));
            }

            table.insert(&entry.name, scores);
        }

        Ok(table)
    }

    /// Load a TOML file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, OverrideError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Register scores for a title, replacing any previous entry
    pub fn insert(&mut self, title: &str, scores: Scores) {
        self.entries.insert(normalize(title), scores);
    }

    /// Overrides for a title, matched on exact normalized form
    pub fn get(&self, title: &str) -> Option<&Scores> {
        self.entries.get(&normalize(title))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
