//! Review sources, ratings and the unified score
//!
//! A [`Rating`] only exists if its value passed the bounds check of its
//! source, so everything downstream of extraction can trust the range.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// External review provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Source {
    /// Rotten Tomatoes Tomatometer, integer percentage
    RottenTomatoes,
    /// Metacritic Metascore, integer 0-100
    Metacritic,
    /// IMDb user rating, decimal 0.0-10.0
    Imdb,
}

impl Source {
    /// All sources in reporting order
    pub const ALL: [Source; 3] = [Source::RottenTomatoes, Source::Metacritic, Source::Imdb];

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Source::RottenTomatoes => "Rotten Tomatoes",
            Source::Metacritic => "Metacritic",
            Source::Imdb => "IMDb",
        }
    }

    /// Inclusive native bounds
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Source::RottenTomatoes | Source::Metacritic => (0.0, 100.0),
            Source::Imdb => (0.0, 10.0),
        }
    }

    /// Whether the native scale only has whole numbers
    pub fn is_integral(&self) -> bool {
        !matches!(self, Source::Imdb)
    }

    /// Factor that maps the native scale onto 0-100
    pub fn scale_factor(&self) -> f64 {
        match self {
            Source::Imdb => 10.0,
            _ => 1.0,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A bounds-checked score from one source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rating {
    source: Source,
    value: f64,
}

impl Rating {
    /// Validate a candidate value against the source's bounds.
    ///
    /// Returns `None` for NaN, out-of-range values, and fractional values on
    /// integral scales.
    pub fn new(source: Source, value: f64) -> Option<Self> {
        let (min, max) = source.bounds();
        if !value.is_finite() || value < min || value > max {
            return None;
        }
        if source.is_integral() && value.fract() != 0.0 {
            return None;
        }
        Some(Self { source, value })
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Value on the source's native scale
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Value rescaled to 0-100
    pub fn normalized(&self) -> f64 {
        self.value * self.source.scale_factor()
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            Source::RottenTomatoes => write!(f, "{}%", self.value),
            Source::Metacritic => write!(f, "{}", self.value),
            Source::Imdb => write!(f, "{:.1}/10", self.value),
        }
    }
}

impl Serialize for Rating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.source.is_integral() {
            serializer.serialize_u32(self.value as u32)
        } else {
            serializer.serialize_f64(self.value)
        }
    }
}

/// Per-source raw scores; `None` means the source did not contribute
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scores {
    pub rotten_tomatoes: Option<Rating>,
    pub metacritic: Option<Rating>,
    pub imdb: Option<Rating>,
}

impl Scores {
    pub fn get(&self, source: Source) -> Option<Rating> {
        match source {
            Source::RottenTomatoes => self.rotten_tomatoes,
            Source::Metacritic => self.metacritic,
            Source::Imdb => self.imdb,
        }
    }

    /// Record a source's outcome. A rating tagged with a different source is
    /// ignored.
    pub fn set(&mut self, source: Source, rating: Option<Rating>) {
        let rating = rating.filter(|r| r.source() == source);
        match source {
            Source::RottenTomatoes => self.rotten_tomatoes = rating,
            Source::Metacritic => self.metacritic = rating,
            Source::Imdb => self.imdb = rating,
        }
    }

    /// Present ratings in reporting order
    pub fn present(&self) -> impl Iterator<Item = Rating> + '_ {
        Source::ALL.into_iter().filter_map(|s| self.get(s))
    }

    /// Number of sources that contributed
    pub fn count(&self) -> usize {
        self.present().count()
    }
}

/// Combine present ratings into `(unified score, contributing count)`.
///
/// Returns `None` when nothing contributed; the caller must treat that as a
/// failure rather than a zero score.
pub fn unify<I>(ratings: I) -> Option<(u32, usize)>
where
    I: IntoIterator<Item = Rating>,
{
    let (total, count) = ratings
        .into_iter()
        .fold((0.0_f64, 0_usize), |(total, count), r| (total + r.normalized(), count + 1));

    if count == 0 {
        return None;
    }

    // f64::round is half away from zero, i.e. half-up for non-negative totals
    let unified = (total / count as f64).round() as u32;
    Some((unified.min(crate::UNIFIED_MAX), count))
}

/// Outcome of scoring one title across all sources
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub movie_title: String,
    pub scores: Scores,
    pub unified_score: u32,
    pub valid_scores: usize,
    pub timestamp: DateTime<Utc>,
    /// Sources whose value came from the override table
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub overridden: Vec<Source>,
}

impl AggregateResult {
    /// Build a result from per-source scores, or `None` if no source
    /// contributed.
    pub fn from_scores(title: &str, scores: Scores, overridden: Vec<Source>) -> Option<Self> {
        let (unified_score, valid_scores) = unify(scores.present())?;
        Some(Self {
            movie_title: title.to_string(),
            scores,
            unified_score,
            valid_scores,
            timestamp: Utc::now(),
            overridden,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(source: Source, value: f64) -> Rating {
        Rating::new(source, value).unwrap()
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(Source::RottenTomatoes, 150.0).is_none());
        assert!(Rating::new(Source::Metacritic, 150.0).is_none());
        assert!(Rating::new(Source::RottenTomatoes, -1.0).is_none());
        assert!(Rating::new(Source::Metacritic, -1.0).is_none());
        assert!(Rating::new(Source::Imdb, 10.5).is_none());
        assert!(Rating::new(Source::Imdb, -0.1).is_none());
        assert!(Rating::new(Source::Imdb, f64::NAN).is_none());

        assert!(Rating::new(Source::RottenTomatoes, 0.0).is_some());
        assert!(Rating::new(Source::Metacritic, 100.0).is_some());
        assert!(Rating::new(Source::Imdb, 10.0).is_some());
    }

    #[test]
    fn test_integral_sources_reject_fractions() {
        assert!(Rating::new(Source::Metacritic, 72.5).is_none());
        assert!(Rating::new(Source::Imdb, 7.5).is_some());
    }

    #[test]
    fn test_imdb_rescaled() {
        assert_eq!(rating(Source::Imdb, 8.5).normalized(), 85.0);
    }

    #[test]
    fn test_unify_partial() {
        let ratings = [rating(Source::RottenTomatoes, 72.0), rating(Source::Imdb, 8.8)];
        assert_eq!(unify(ratings), Some((80, 2)));
    }

    #[test]
    fn test_unify_all_three() {
        let ratings = [
            rating(Source::RottenTomatoes, 96.0),
            rating(Source::Metacritic, 96.0),
            rating(Source::Imdb, 9.3),
        ];
        assert_eq!(unify(ratings), Some((95, 3)));
    }

    #[test]
    fn test_unify_rounds_half_up() {
        let ratings = [rating(Source::RottenTomatoes, 80.0), rating(Source::Metacritic, 81.0)];
        assert_eq!(unify(ratings), Some((81, 2)));
    }

    #[test]
    fn test_unify_empty_is_none() {
        assert_eq!(unify(Vec::new()), None);
        assert!(AggregateResult::from_scores("x", Scores::default(), vec![]).is_none());
    }

    #[test]
    fn test_scores_set_ignores_mismatched_source() {
        let mut scores = Scores::default();
        scores.set(Source::Metacritic, Some(rating(Source::Imdb, 8.0)));
        assert_eq!(scores.count(), 0);
    }

    #[test]
    fn test_serialize_aggregate() {
        let mut scores = Scores::default();
        scores.set(Source::RottenTomatoes, Some(rating(Source::RottenTomatoes, 72.0)));
        scores.set(Source::Imdb, Some(rating(Source::Imdb, 8.8)));
        let result = AggregateResult::from_scores("Inception", scores, vec![]).unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["movieTitle"], "Inception");
        assert_eq!(json["scores"]["rottenTomatoes"], 72);
        assert!(json["scores"]["metacritic"].is_null());
        assert_eq!(json["scores"]["imdb"], 8.8);
        assert_eq!(json["unifiedScore"], 80);
        assert_eq!(json["validScores"], 2);
        assert!(json["timestamp"].is_string());
        assert!(json.get("overridden").is_none());
    }
}
