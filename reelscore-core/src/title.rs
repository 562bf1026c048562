//! Title normalization and matching
//!
//! Matching is a symmetric containment test on normalized forms, so
//! "Inception" matches "Inception (2010)". It accepts some false positives
//! in exchange for tolerating subtitles and edition suffixes.

/// Canonical form: lowercase alphanumerics and single spaces
pub fn normalize(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True if either normalized title contains the other
pub fn matches(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);

    if a.is_empty() || b.is_empty() {
        return false;
    }

    a.contains(&b) || b.contains(&a)
}

/// Index of the first candidate title matching the query
pub fn best_match<'a, I>(candidates: I, query: &str) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates.into_iter().position(|candidate| matches(candidate, query))
}
