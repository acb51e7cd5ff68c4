//! Fallback extraction by paragraph density.
//!
//! Ignores page structure entirely and keeps every reasonably long `<p>`
//! outside navigation chrome, in document order. Works on templates with
//! no semantic markup at the cost of occasionally picking up boilerplate.

use super::{ExtractionStrategy, paragraphs_in};
use crate::models::ExtractionMethod;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

/// Paragraphs shorter than this (in chars) are treated as chrome.
pub const MIN_PARAGRAPH_CHARS: usize = 40;

static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("body selector is valid"));

#[derive(Debug, Default, Clone, Copy)]
pub struct DensityExtractor;

impl ExtractionStrategy for DensityExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Density
    }

    fn extract(&self, document: &Html) -> Option<String> {
        let body = document.select(&BODY).next()?;
        let paragraphs = paragraphs_in(body, MIN_PARAGRAPH_CHARS);
        (!paragraphs.is_empty()).then(|| paragraphs.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_long_paragraphs_outside_chrome() {
        let html = r#"<html><body>
            <nav><p>Home | World | Business | Technology | Science | Sports</p></nav>
            <div class="story">
              <p>Negotiators worked through the night to finalize the agreement text.</p>
              <p>Short caption</p>
              <p>The deal still needs ratification by each member parliament before taking effect.</p>
            </div>
            <footer><p>Copyright 2025 Example Media Group. All rights reserved worldwide.</p></footer>
        </body></html>"#;
        let body = DensityExtractor.extract(&Html::parse_document(html)).unwrap();
        assert_eq!(
            body,
            "Negotiators worked through the night to finalize the agreement text.\n\n\
             The deal still needs ratification by each member parliament before taking effect."
        );
    }

    #[test]
    fn test_nothing_long_enough() {
        let html = "<html><body><p>Too short.</p><div>No paragraphs here at all, just a div of text.</div></body></html>";
        assert_eq!(DensityExtractor.extract(&Html::parse_document(html)), None);
    }
}
