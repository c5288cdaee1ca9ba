//! Poll extraction: turn one node page into a [`PollRecord`] or a no-data outcome.

use scraper::Html;

use crate::fetch::PageSource;
use crate::metadata::{element_text, page_title, published_date, selector};
use crate::types::{Extraction, NoDataReason, PollError, PollId, PollOption, PollRecord, PollResult};

/// Anchor of the poll widget on a node page.
const POLL_WIDGET: &str = "#poll";
/// Option labels inside the widget.
const OPTION_LABEL: &str = "span.polltext";
/// Vote counts inside the widget, positionally matched to the labels.
const OPTION_VOTES: &str = "span.nvb.voteup";

/// Fetch `url` and extract the poll `id` from it.
///
/// `ceiling` is the most options the renderer can colour distinctly.
pub async fn extract_poll(
    source: &dyn PageSource,
    id: &PollId,
    url: &str,
    ceiling: usize,
) -> PollResult<Extraction> {
    let html = source.fetch(url).await?;
    parse_poll_page(id, &html, ceiling)
}

/// Extract a poll from an already fetched node page.
pub fn parse_poll_page(id: &PollId, html: &str, ceiling: usize) -> PollResult<Extraction> {
    let document = Html::parse_document(html);
    let widget_sel = selector(POLL_WIDGET)?;
    let label_sel = selector(OPTION_LABEL)?;
    let votes_sel = selector(OPTION_VOTES)?;

    let Some(widget) = document.select(&widget_sel).next() else {
        return Ok(Extraction::NoData(NoDataReason::WidgetAbsent));
    };

    let labels: Vec<String> = widget.select(&label_sel).map(element_text).collect();
    let vote_texts: Vec<String> = widget.select(&votes_sel).map(element_text).collect();

    if labels.is_empty() {
        return Ok(Extraction::NoData(NoDataReason::NoOptions));
    }
    if labels.len() != vote_texts.len() {
        return Ok(Extraction::NoData(NoDataReason::MismatchedCounts {
            options: labels.len(),
            votes: vote_texts.len(),
        }));
    }

    let mut options = Vec::with_capacity(labels.len());
    for (label, text) in labels.into_iter().zip(vote_texts) {
        let Ok(votes) = text.trim().parse::<u64>() else {
            return Ok(Extraction::NoData(NoDataReason::NonNumericVote { text }));
        };
        options.push(PollOption { label, votes });
    }

    if options.len() > ceiling {
        return Ok(Extraction::NoData(NoDataReason::TooManyOptions {
            count: options.len(),
            ceiling,
        }));
    }

    let title = page_title(&document)?
        .ok_or_else(|| PollError::Parse(format!("poll {id} has no <title>")))?;
    let published = published_date(&document)?;

    Ok(Extraction::Poll(PollRecord::new(
        id.clone(),
        title,
        published,
        options,
    )))
}
