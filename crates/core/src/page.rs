//! Rendered page inspection.
//!
//! This module provides the [`Page`] type for parsing a rendered article page
//! and pulling out the text that summarization works on.
//!
//! # Example
//!
//! ```rust
//! use readcast_core::page::Page;
//!
//! let html = "<html><head><title>Tin</title></head><body><p>Hello</p></body></html>";
//! let page = Page::parse(html);
//! assert_eq!(page.title(), Some("Tin".to_string()));
//! ```

use scraper::{Html, Selector};

use crate::scoring::normalize_whitespace;
use crate::{ReadcastError, Result};

/// Content containers tried in order when looking for the article body.
///
/// Site specific containers come first, generic ones last.
pub const CONTENT_SELECTORS: &[&str] = &[
    ".fck_detail",
    ".article-content",
    ".content-detail",
    ".singular-content",
    ".dt-news__content",
    ".e-magazine__body",
    "article",
    ".post-content",
    ".entry-content",
    ".article-body",
    "main",
];

/// A container must hold more than this many characters to be accepted.
const MIN_CONTAINER_CHARS: usize = 100;

/// Extracted text is cut to this many characters.
const MAX_EXTRACTED_CHARS: usize = 10_000;

/// Extractions with this many characters or fewer are discarded.
const MIN_EXTRACTED_CHARS: usize = 50;

/// A parsed HTML page.
pub struct Page {
    html: Html,
}

impl Page {
    /// Parses an HTML document. Parsing is lenient and never fails.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Gets the content of the `<title>` element if present.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
    }

    /// Whitespace-normalized text of the first element matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`ReadcastError::HtmlParseError`] if the selector is invalid.
    pub fn select_text(&self, selector: &str) -> Result<Option<String>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).next().map(|el| normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "))))
    }

    /// Values of `attr` on every element matching `selector`, in document order.
    pub fn attr_values(&self, selector: &str, attr: &str) -> Result<Vec<String>> {
        let sel = parse_selector(selector)?;
        Ok(self
            .html
            .select(&sel)
            .filter_map(|el| el.value().attr(attr))
            .map(str::to_string)
            .collect())
    }

    /// Normalized text of the `<body>`, excluding scripts and styles.
    pub fn body_text(&self) -> String {
        let Ok(selector) = Selector::parse("body") else {
            return String::new();
        };
        let Some(body) = self.html.select(&selector).next() else {
            return String::new();
        };

        let mut parts = Vec::new();
        for node in body.descendants() {
            if let Some(text) = node.value().as_text() {
                let inside_code = node.ancestors().any(|a| {
                    a.value()
                        .as_element()
                        .is_some_and(|e| matches!(e.name(), "script" | "style" | "noscript"))
                });
                if !inside_code {
                    parts.push(text.to_string());
                }
            }
        }

        normalize_whitespace(&parts.join(" "))
    }

    /// Main article text for summarization.
    ///
    /// Tries [`CONTENT_SELECTORS`] in order and takes the first container with
    /// more than 100 characters, falling back to the whole body. The result is
    /// capped at 10 000 characters; `None` means nothing worth summarizing
    /// (50 characters or fewer) was found.
    pub fn extract_article_text(&self) -> Option<String> {
        let mut content = String::new();

        for selector in CONTENT_SELECTORS {
            if let Ok(Some(text)) = self.select_text(selector) {
                content = text;
                if content.chars().count() > MIN_CONTAINER_CHARS {
                    break;
                }
            }
        }

        if content.chars().count() < MIN_CONTAINER_CHARS {
            content = self.body_text();
        }

        if let Some((byte_index, _)) = content.char_indices().nth(MAX_EXTRACTED_CHARS) {
            content.truncate(byte_index);
        }

        (content.chars().count() > MIN_EXTRACTED_CHARS).then_some(content)
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ReadcastError::HtmlParseError(format!("Invalid selector: {}", e)))
}

/// Convenience wrapper for [`Page::extract_article_text`].
pub fn extract_article_text(html: &str) -> Option<String> {
    Page::parse(html).extract_article_text()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "Hà Nội hôm nay đón đợt không khí lạnh mạnh nhất từ đầu mùa, \
                        nhiệt độ giảm sâu ở nhiều tỉnh miền Bắc và vùng núi cao.";

    #[test]
    fn test_title() {
        let page = Page::parse("<html><head><title> Tin nóng </title></head><body></body></html>");
        assert_eq!(page.title(), Some("Tin nóng".to_string()));
    }

    #[test]
    fn test_prefers_site_container() {
        let html = format!(
            r#"<html><body><nav>Trang chủ Thời sự Thế giới</nav>
               <div class="fck_detail"><p>{BODY}</p></div>
               <article><p>Other article text that is not the main body at all, repeated. {BODY}</p></article>
               </body></html>"#
        );
        assert_eq!(extract_article_text(&html), Some(BODY.to_string()));
    }

    #[test]
    fn test_skips_small_containers() {
        let html = format!(r#"<html><body><div class="fck_detail">Quảng cáo</div><main><p>{BODY}</p></main></body></html>"#);
        assert_eq!(extract_article_text(&html), Some(BODY.to_string()));
    }

    #[test]
    fn test_falls_back_to_body_without_scripts() {
        let html = format!(r#"<html><body><div><p>{BODY}</p><script>var audio = "x.mp3";</script></div></body></html>"#);
        let text = extract_article_text(&html).unwrap();
        assert!(text.starts_with("Hà Nội"));
        assert!(!text.contains("audio"));
    }

    #[test]
    fn test_tiny_page_yields_none() {
        assert_eq!(extract_article_text("<html><body><p>Xin chào</p></body></html>"), None);
    }

    #[test]
    fn test_caps_length() {
        let long = "chữ ".repeat(4000);
        let html = format!("<html><body><article>{long}</article></body></html>");
        let text = extract_article_text(&html).unwrap();
        assert_eq!(text.chars().count(), 10_000);
    }

    #[test]
    fn test_invalid_selector() {
        let page = Page::parse("<p>x</p>");
        assert!(matches!(page.select_text("[[invalid"), Err(ReadcastError::HtmlParseError(_))));
    }

    #[test]
    fn test_attr_values() {
        let page = Page::parse(r#"<audio src="a.mp3"></audio><audio><source src="b.m4a"></audio>"#);
        assert_eq!(page.attr_values("audio, source", "src").unwrap(), vec!["a.mp3", "b.m4a"]);
    }
}
