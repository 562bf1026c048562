//! Visible text extraction
//!
//! Text scanning strategies work on what a reader would see, so script,
//! style and noscript subtrees are dropped.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// `<title>` of an HTML page, trimmed
pub fn title(html: &str) -> Option<String> {
    Html::parse_document(html)
        .select(&TITLE)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Visible text of the document body
pub fn visible_text(document: &Html) -> String {
    match document.select(&BODY).next() {
        Some(body) => element_text(body),
        None => String::new(),
    }
}

/// Visible text under one element
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut text_parts = Vec::new();

    // Walk all descendants, skip script/style/noscript subtrees
    for node_ref in element.descendants() {
        if let Node::Text(text_node) = node_ref.value() {
            let in_excluded = node_ref.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map(|el| matches!(el.name(), "script" | "style" | "noscript"))
                    .unwrap_or(false)
            });

            if !in_excluded {
                let trimmed = text_node.trim();
                if !trimmed.is_empty() {
                    text_parts.push(trimmed.to_string());
                }
            }
        }
    }

    normalize_whitespace(&text_parts.join(" "))
}

/// Non-empty trimmed text lines of an element, in document order
pub fn text_lines(element: ElementRef<'_>) -> Vec<String> {
    element
        .text()
        .flat_map(|chunk| chunk.lines())
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_text() {
        let markup = r#"
            <html>
            <head><title>Inception (2010)</title></head>
            <body>
                <script>var score = 12;</script>
                <h1>Inception</h1>
                <p>Tomatometer 87%</p>
                <style>.x { color: red; }</style>
                <noscript>enable js</noscript>
            </body>
            </html>
        "#;
        let html = Html::parse_document(markup);

        assert_eq!(title(markup).as_deref(), Some("Inception (2010)"));
        let text = visible_text(&html);
        assert_eq!(text, "Inception Tomatometer 87%");
    }

    #[test]
    fn test_text_lines() {
        let html = Html::parse_fragment("<div>\n  Inception\n  <span>2010</span>\n\n <b> 74 </b></div>");
        let div = html.select(&Selector::parse("div").unwrap()).next().unwrap();
        assert_eq!(text_lines(div), vec!["Inception", "2010", "74"]);
    }

    #[test]
    fn test_normalize_whitespace() {
        let input = "  hello   world  \n\t  test  ";
        assert_eq!(normalize_whitespace(input), "hello world test");
    }
}
