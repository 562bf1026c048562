//! Reusable extraction strategies
//!
//! - [`Markers`]: known structural markers in priority order
//! - [`StructuredData`]: embedded metadata records (JSON-LD, inline JSON)
//! - [`TextScan`]: bounded numerals in visible text, years excluded

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::warn;

use reelscore_fetch::page;

use crate::cascade::{capture_all, capture_number, is_release_year, Strategy, NUMBER};

static LD_JSON: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());
static SCRIPT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());

fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!("Skipping invalid selector {:?}: {:?}", css, e);
            None
        }
    }
}

enum Read {
    Text,
    Attr(&'static str),
}

struct Marker {
    selector: Selector,
    read: Read,
}

/// Structural markers tried in priority order.
///
/// For each marker, the first matching element is read; text markers apply
/// the strategy's pattern, attribute markers take the attribute's numeral.
pub struct Markers {
    pattern: Regex,
    markers: Vec<Marker>,
}

impl Markers {
    /// Markers whose text is matched against `pattern` (group 1 = score)
    pub fn new(pattern: Regex) -> Self {
        Self {
            pattern,
            markers: Vec::new(),
        }
    }

    /// Markers reading the first numeral of the text
    pub fn numeric() -> Self {
        Self::new(NUMBER.clone())
    }

    pub fn text(mut self, css: &str) -> Self {
        if let Some(selector) = parse_selector(css) {
            self.markers.push(Marker {
                selector,
                read: Read::Text,
            });
        }
        self
    }

    pub fn attr(mut self, css: &str, attr: &'static str) -> Self {
        if let Some(selector) = parse_selector(css) {
            self.markers.push(Marker {
                selector,
                read: Read::Attr(attr),
            });
        }
        self
    }
}

impl Strategy for Markers {
    fn name(&self) -> &'static str {
        "markers"
    }

    fn candidates(&self, document: &Html) -> Vec<f64> {
        self.markers
            .iter()
            .filter_map(|marker| {
                let element = document.select(&marker.selector).next()?;
                match marker.read {
                    Read::Text => capture_number(&self.pattern, &page::element_text(element)),
                    Read::Attr(name) => capture_number(&NUMBER, element.value().attr(name)?),
                }
            })
            .collect()
    }
}

/// Embedded structured-data records.
///
/// Looks for `aggregateRating.ratingValue` in JSON-LD blocks, then scans
/// every inline script for `"ratingValue"` and any extra keys.
pub struct StructuredData {
    keys: Vec<Regex>,
}

impl StructuredData {
    pub fn new() -> Self {
        Self { keys: Vec::new() }.key("ratingValue")
    }

    /// Also accept `"key": <number>` pairs found in inline scripts
    pub fn key(mut self, key: &str) -> Self {
        let pattern = format!(r#""{}"\s*:\s*"?(\d+(?:\.\d+)?)"#, regex::escape(key));
        match Regex::new(&pattern) {
            Ok(re) => self.keys.push(re),
            Err(e) => warn!("Skipping structured-data key {:?}: {}", key, e),
        }
        self
    }
}

impl Default for StructuredData {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for StructuredData {
    fn name(&self) -> &'static str {
        "structured-data"
    }

    fn candidates(&self, document: &Html) -> Vec<f64> {
        let mut candidates = Vec::new();

        for block in document.select(&LD_JSON) {
            let raw = block.text().collect::<String>();
            if let Ok(value) = serde_json::from_str::<Value>(&raw) {
                collect_aggregate_ratings(&value, &mut candidates);
            }
        }

        for script in document.select(&SCRIPT) {
            let raw = script.text().collect::<String>();
            for key in &self.keys {
                candidates.extend(capture_all(key, &raw));
            }
        }

        candidates
    }
}

/// Walk a JSON value for `aggregateRating.ratingValue`
fn collect_aggregate_ratings(value: &Value, out: &mut Vec<f64>) {
    match value {
        Value::Object(map) => {
            if let Some(rating) = map.get("aggregateRating") {
                if let Some(v) = rating.get("ratingValue").and_then(json_number) {
                    out.push(v);
                }
            }
            for (key, child) in map {
                if key != "aggregateRating" {
                    collect_aggregate_ratings(child, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_aggregate_ratings(item, out);
            }
        }
        _ => {}
    }
}

/// A JSON number, or a string holding one
pub fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// How unlabelled numerals are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    /// Largest value first
    Max,
    /// Document order
    First,
}

/// Numeral scan over visible text.
///
/// Labelled numerals come first, in document order. The rest follow in
/// `pick` order, with plausible release years removed.
pub struct TextScan {
    scope: Vec<Selector>,
    label: Option<Regex>,
    numeral: Regex,
    pick: Pick,
}

impl TextScan {
    pub fn new(numeral: Regex) -> Self {
        Self {
            scope: Vec::new(),
            label: None,
            numeral,
            pick: Pick::Max,
        }
    }

    /// Restrict the scan to these sections when any are present
    pub fn within(mut self, css: &str) -> Self {
        if let Some(selector) = parse_selector(css) {
            self.scope.push(selector);
        }
        self
    }

    pub fn label(mut self, label: Regex) -> Self {
        self.label = Some(label);
        self
    }

    pub fn pick(mut self, pick: Pick) -> Self {
        self.pick = pick;
        self
    }

    fn text(&self, document: &Html) -> String {
        let scoped: Vec<String> = self
            .scope
            .iter()
            .flat_map(|selector| document.select(selector))
            .map(page::element_text)
            .filter(|text| !text.is_empty())
            .collect();

        if scoped.is_empty() {
            page::visible_text(document)
        } else {
            scoped.join(" ")
        }
    }
}

impl Strategy for TextScan {
    fn name(&self) -> &'static str {
        "text-scan"
    }

    fn candidates(&self, document: &Html) -> Vec<f64> {
        let text = self.text(document);

        let mut candidates = self
            .label
            .as_ref()
            .map(|label| capture_all(label, &text))
            .unwrap_or_default();

        let mut numerals: Vec<f64> = capture_all(&self.numeral, &text)
            .into_iter()
            .filter(|v| !is_release_year(*v))
            .collect();
        if self.pick == Pick::Max {
            numerals.sort_by(|a, b| b.total_cmp(a));
        }

        candidates.extend(numerals);
        candidates
    }
}
