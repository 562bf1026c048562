//! Review site registry
//!
//! Provides the URL templates each source's extractor starts from.

use serde::{Deserialize, Serialize};

use crate::Source;

/// A review site and its search endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Source this site reports for
    pub source: Source,
    /// Scheme and host, no trailing slash
    pub base_url: String,
    /// Path template with {query} placeholder
    pub search_template: String,
    /// Optional JSON search path template with {query} placeholder
    pub api_template: Option<String>,
}

impl Site {
    /// Default registry entry for a source
    pub fn default_for(source: Source) -> Self {
        match source {
            Source::RottenTomatoes => Self {
                source,
                base_url: "https://www.rottentomatoes.com".to_string(),
                search_template: "/search?search={query}".to_string(),
                api_template: None,
            },
            Source::Metacritic => Self {
                source,
                base_url: "https://www.metacritic.com".to_string(),
                search_template: "/search/{query}/".to_string(),
                api_template: Some("/api/v1/search/movie/{query}".to_string()),
            },
            Source::Imdb => Self {
                source,
                base_url: "https://www.imdb.com".to_string(),
                search_template: "/find/?q={query}&s=tt&ttype=ft".to_string(),
                api_template: None,
            },
        }
    }

    /// Point the site at another host, e.g. a local fixture server
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Build the HTML search URL for a title
    pub fn search_url(&self, title: &str) -> String {
        self.fill(&self.search_template, title)
    }

    /// Build the JSON search URL for a title, if the site has one
    pub fn api_url(&self, title: &str) -> Option<String> {
        self.api_template
            .as_ref()
            .map(|template| self.fill(template, title))
    }

    /// Resolve a link found on one of the site's pages
    pub fn resolve(&self, href: &str) -> String {
        let href = href.trim();
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if let Some(rest) = href.strip_prefix("//") {
            format!("https://{}", rest)
        } else if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            format!("{}/{}", self.base_url, href)
        }
    }

    fn fill(&self, template: &str, title: &str) -> String {
        format!(
            "{}{}",
            self.base_url,
            template.replace("{query}", &urlencoding::encode(title.trim()))
        )
    }
}

/// Default registry, one site per source
pub fn default_sites() -> Vec<Site> {
    Source::ALL.into_iter().map(Site::default_for).collect()
}

/// Lowercase slug with runs of non-alphanumerics collapsed to `-`
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());

    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }

    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_encodes_title() {
        let site = Site::default_for(Source::RottenTomatoes);
        assert_eq!(
            site.search_url("The Dark Knight"),
            "https://www.rottentomatoes.com/search?search=The%20Dark%20Knight"
        );
    }

    #[test]
    fn test_api_url_only_for_metacritic() {
        assert!(Site::default_for(Source::Imdb).api_url("Up").is_none());
        assert_eq!(
            Site::default_for(Source::Metacritic).api_url("Up").as_deref(),
            Some("https://www.metacritic.com/api/v1/search/movie/Up")
        );
    }

    #[test]
    fn test_resolve() {
        let site = Site::default_for(Source::Imdb).with_base_url("http://localhost:8080/");
        assert_eq!(site.resolve("/title/tt1375666/"), "http://localhost:8080/title/tt1375666/");
        assert_eq!(site.resolve("https://m.imdb.com/x"), "https://m.imdb.com/x");
        assert_eq!(site.resolve("//cdn.example.com/a"), "https://cdn.example.com/a");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Spider-Man: Into the Spider-Verse"), "spider-man-into-the-spider-verse");
        assert_eq!(slugify("  WALL·E  "), "wall-e");
    }

    #[test]
    fn test_default_sites() {
        let sites = default_sites();
        assert_eq!(sites.len(), 3);
        assert_eq!(sites[2].source, Source::Imdb);
    }
}
