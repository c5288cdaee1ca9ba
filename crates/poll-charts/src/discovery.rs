//! Poll discovery: find the active polls on the forum's poll listing.

use scraper::{ElementRef, Html};
use url::Url;

use crate::fetch::PageSource;
use crate::metadata::selector;
use crate::types::{PollError, PollId, PollResult};

/// Listing rows.
const TOPIC_ROW: &str = "td.topic";
/// Marker nested in a row whose poll is closed.
const EXPIRED_MARKER: &str = "span.marker.expired";

/// Fetch the listing at `listing_url` and return its active poll ids.
pub async fn discover(source: &dyn PageSource, listing_url: &str) -> PollResult<Vec<PollId>> {
    tracing::info!(url = listing_url, "sourcing active polls");
    let html = source.fetch(listing_url).await?;
    let ids = find_active_polls(&html, listing_url)?;
    tracing::info!(count = ids.len(), "active polls found");
    Ok(ids)
}

/// Ids of every listing row without an expired marker, in listing order.
///
/// A document with no topic rows at all is not a poll listing and is reported
/// as a parse error rather than an empty result.
pub fn find_active_polls(html: &str, listing_url: &str) -> PollResult<Vec<PollId>> {
    let base = Url::parse(listing_url)
        .map_err(|e| PollError::Parse(format!("invalid listing url {listing_url:?}: {e}")))?;
    let document = Html::parse_document(html);
    let row_sel = selector(TOPIC_ROW)?;
    let expired_sel = selector(EXPIRED_MARKER)?;
    let link_sel = selector("a[href]")?;

    let mut rows = 0usize;
    let mut ids = Vec::new();

    for row in document.select(&row_sel) {
        rows += 1;
        if row.select(&expired_sel).next().is_some() {
            continue;
        }
        match row_id(row, &link_sel, &base) {
            Some(id) => ids.push(id),
            None => tracing::warn!(row = rows, "active listing row has no usable link"),
        }
    }

    if rows == 0 {
        return Err(PollError::Parse(format!(
            "no `{TOPIC_ROW}` rows in listing {listing_url}"
        )));
    }
    Ok(ids)
}

fn row_id(row: ElementRef<'_>, link_sel: &scraper::Selector, base: &Url) -> Option<PollId> {
    let href = row.select(link_sel).next()?.value().attr("href")?;
    trailing_segment(base, href).map(PollId::new)
}

/// Last non-empty path segment of `href`, resolved against `base`.
fn trailing_segment(base: &Url, href: &str) -> Option<String> {
    let url = base.join(href.trim()).ok()?;
    url.path_segments()?
        .rfind(|s| !s.is_empty())
        .map(str::to_string)
}
