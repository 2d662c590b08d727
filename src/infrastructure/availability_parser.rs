//! Availability text extraction from product page markup
//!
//! Looks up the element carrying the availability notice (`#availability`
//! on the primary target site) and returns its visible text normalized for
//! classification. A page without that element is a normal outcome and
//! yields an empty fragment.

use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};

pub const DEFAULT_AVAILABILITY_SELECTOR: &str = "#availability";

/// Elements whose text never reaches the reader
const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Debug, Clone)]
pub struct AvailabilityParser {
    selector: Selector,
    selector_source: String,
}

impl AvailabilityParser {
    /// Parser for the default `#availability` element
    pub fn new() -> ParsingResult<Self> {
        Self::with_selector(DEFAULT_AVAILABILITY_SELECTOR)
    }

    pub fn with_selector(selector: &str) -> ParsingResult<Self> {
        if selector.trim().is_empty() {
            return Err(ParsingError::ConfigurationError {
                message: "availability selector must not be empty".to_string(),
                field: "extractor.availability_selector".to_string(),
            });
        }
        let parsed = Selector::parse(selector)
            .map_err(|e| ParsingError::invalid_selector(selector, format!("{e:?}")))?;

        Ok(Self {
            selector: parsed,
            selector_source: selector.to_string(),
        })
    }

    pub fn selector(&self) -> &str {
        &self.selector_source
    }

    /// Normalized availability text, or `None` if the page has no such element
    pub fn find_availability(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let element = document.select(&self.selector).next()?;

        let mut raw = String::new();
        collect_visible_text(element, &mut raw);
        Some(normalize_fragment(&raw))
    }

    /// Like [`Self::find_availability`] but maps absence to an empty fragment
    pub fn extract(&self, html: &str) -> String {
        self.find_availability(html).unwrap_or_else(|| {
            debug!("No element matched {} - treating availability as unknown", self.selector_source);
            String::new()
        })
    }
}

fn collect_visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            // adjacent text nodes join with no separator; only source whitespace splits words
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if INVISIBLE_TAGS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_visible_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}

/// Lowercase, collapse whitespace runs to a single space, trim
pub fn normalize_fragment(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parser_creation() {
        let parser = AvailabilityParser::new();
        assert!(parser.is_ok());
        assert_eq!(parser.unwrap().selector(), "#availability");
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        assert!(matches!(
            AvailabilityParser::with_selector("div[[["),
            Err(ParsingError::InvalidSelector { .. })
        ));
        assert!(matches!(
            AvailabilityParser::with_selector("  "),
            Err(ParsingError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_extracts_amazon_style_block() {
        let parser = AvailabilityParser::new().unwrap();
        let html = r#"
            <html><body>
              <div id="centerCol">
                <div id="availability" class="a-section a-spacing-base">
                  <span class="a-size-medium a-color-success">
                    In Stock
                  </span>
                </div>
              </div>
            </body></html>
        "#;

        assert_eq!(parser.find_availability(html), Some("in stock".to_string()));
    }

    #[test]
    fn test_missing_element_yields_empty_fragment() {
        let parser = AvailabilityParser::new().unwrap();
        let html = "<html><body><p>Price: $10</p></body></html>";

        assert_eq!(parser.find_availability(html), None);
        assert_eq!(parser.extract(html), "");
    }

    #[test]
    fn test_nested_text_is_joined_and_collapsed() {
        let parser = AvailabilityParser::new().unwrap();
        let html = r#"<div id="availability"><span>Currently</span> <span>Unavailable.</span>
            <br><span>We don't know when
            this item will be back.</span></div>"#;

        assert_eq!(
            parser.extract(html),
            "currently unavailable. we don't know when this item will be back."
        );

        let adjacent = r#"<div id="availability"><span>Currently</span><span>Unavailable.</span></div>"#;
        assert_eq!(parser.extract(adjacent), "currentlyunavailable.");
    }

    #[rstest]
    #[case(r#"<div id="availability">In St<b>ock</b></div>"#, "in stock")]
    #[case(r#"<div id="availability"><span>Add to </span><span>Ca</span>rt</div>"#, "add to cart")]
    #[case(r#"<div id="availability">Currently <i>un</i>available.</div>"#, "currently unavailable.")]
    fn test_words_split_across_inline_elements(#[case] html: &str, #[case] expected: &str) {
        let parser = AvailabilityParser::new().unwrap();
        assert_eq!(parser.extract(html), expected);
    }

    #[test]
    fn test_script_and_style_text_is_ignored() {
        let parser = AvailabilityParser::new().unwrap();
        let html = r#"<div id="availability">
            <script>var label = "in stock";</script>
            <style>.x { content: "add to cart"; }</style>
            <span>Temporarily out of stock.</span>
        </div>"#;

        assert_eq!(parser.extract(html), "temporarily out of stock.");
    }

    #[test]
    fn test_only_first_match_is_used() {
        let parser = AvailabilityParser::with_selector(".availability").unwrap();
        let html = r#"<p class="availability">In stock</p><p class="availability">Currently unavailable</p>"#;

        assert_eq!(parser.extract(html), "in stock");
    }

    #[test]
    fn test_malformed_markup_does_not_fail() {
        let parser = AvailabilityParser::new().unwrap();
        let html = r#"<html><div id="availability"><span>Add to Cart<div><<</span></html"#;

        assert!(parser.extract(html).starts_with("add to cart"));
        assert_eq!(parser.extract(""), "");
        assert_eq!(parser.extract("\u{0}\u{fffd}<<>>"), "");
    }

    #[test]
    fn test_normalize_fragment() {
        assert_eq!(normalize_fragment("  In\n\t Stock.  "), "in stock.");
        assert_eq!(normalize_fragment(""), "");
    }
}
