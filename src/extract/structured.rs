//! Primary extraction from structured article markup.
//!
//! Publishers that care about search snippets embed the full story in
//! JSON-LD (`"articleBody"`), and most templates wrap the story in an
//! `<article>` or an `itemprop="articleBody"` container. Both are tried in
//! that order.

use super::{ExtractionStrategy, paragraphs_in};
use crate::models::ExtractionMethod;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;

static JSON_LD: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("JSON-LD selector is valid")
});

static CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [r#"[itemprop="articleBody"]"#, "article", "main"]
        .iter()
        .map(|s| Selector::parse(s).expect("container selector is valid"))
        .collect()
});

#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredExtractor;

impl ExtractionStrategy for StructuredExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Structured
    }

    fn extract(&self, document: &Html) -> Option<String> {
        json_ld_body(document).or_else(|| container_body(document))
    }
}

fn json_ld_body(document: &Html) -> Option<String> {
    document
        .select(&JSON_LD)
        .filter_map(|script| serde_json::from_str::<Value>(script.text().collect::<String>().trim()).ok())
        .find_map(|json| find_article_body(&json))
}

/// Depth-first search for a non-empty `articleBody` string (covers `@graph` arrays).
fn find_article_body(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(body)) = map.get("articleBody") {
                let body = body.trim();
                if !body.is_empty() {
                    return Some(body.to_string());
                }
            }
            map.values().find_map(find_article_body)
        }
        Value::Array(items) => items.iter().find_map(find_article_body),
        _ => None,
    }
}

fn container_body(document: &Html) -> Option<String> {
    CONTAINERS.iter().find_map(|selector| {
        let paragraphs: Vec<String> = document
            .select(selector)
            .flat_map(|container| paragraphs_in(container, 1))
            .collect();
        (!paragraphs.is_empty()).then(|| paragraphs.join("\n\n"))
    })
}
