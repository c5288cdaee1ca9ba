//! Page-level metadata: the `<title>` text and the JSON-LD publish date.

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::types::{PollError, PollResult, PublishDate};

/// Separator the forum puts between a page's own title and the site name.
pub const TITLE_SEPARATOR: &str = " - ";

/// Compile a CSS selector, reporting failure as a parse error.
pub(crate) fn selector(css: &str) -> PollResult<Selector> {
    Selector::parse(css).map_err(|e| PollError::Parse(format!("bad selector {css:?}: {e:?}")))
}

/// Visible text of an element with whitespace collapsed.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text before the first `" - "`, trimmed.
///
/// `"Best Deal Poll - OzBargain"` becomes `"Best Deal Poll"`. Applying it
/// twice gives the same result as applying it once.
pub fn strip_site_suffix(title: &str) -> &str {
    title
        .split(TITLE_SEPARATOR)
        .next()
        .unwrap_or_default()
        .trim()
}

/// The page title with the site suffix removed, if the page has a `<title>`.
pub fn page_title(document: &Html) -> PollResult<Option<String>> {
    let sel = selector("title")?;
    Ok(document
        .select(&sel)
        .next()
        .map(|el| strip_site_suffix(&element_text(el)).to_string()))
}

/// Publish date from embedded JSON-LD `datePublished`, or `Unknown`.
pub fn published_date(document: &Html) -> PollResult<PublishDate> {
    let sel = selector(r#"script[type="application/ld+json"]"#)?;
    for element in document.select(&sel) {
        let text = element.inner_html();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(text) else {
            tracing::debug!("skipping malformed JSON-LD block");
            continue;
        };
        if let Some(date) = find_date_published(&value) {
            return Ok(PublishDate::Known(date));
        }
    }
    Ok(PublishDate::Unknown)
}

// Only the top-level object (or items of a top-level array) and the items
// of its @graph are considered. Nested properties such as `comment` are not.
fn find_date_published(value: &Value) -> Option<NaiveDate> {
    let roots: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    roots.into_iter().find_map(|root| {
        own_date_published(root).or_else(|| {
            root.get("@graph")
                .and_then(Value::as_array)
                .and_then(|graph| graph.iter().find_map(own_date_published))
        })
    })
}

fn own_date_published(item: &Value) -> Option<NaiveDate> {
    if item.get("@type").and_then(Value::as_str) == Some("Comment") {
        return None;
    }
    item.get("datePublished")
        .and_then(Value::as_str)
        .and_then(parse_iso_date)
}

/// Parse the `YYYY-MM-DD` prefix of an ISO-8601 timestamp.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let prefix = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}
