//! Core data types for scraped polls.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Opaque identifier naming a poll's node page (the trailing URL segment).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollId(String);

impl PollId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PollId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One selectable option, paired with its vote count when the page is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    /// Option text as displayed on the page.
    pub label: String,
    /// Votes the option has received.
    pub votes: u64,
}

/// When a poll was published, if the page says so.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "date", rename_all = "snake_case")]
pub enum PublishDate {
    Known(NaiveDate),
    Unknown,
}

impl PublishDate {
    pub fn known(&self) -> Option<NaiveDate> {
        match self {
            PublishDate::Known(d) => Some(*d),
            PublishDate::Unknown => None,
        }
    }
}

impl fmt::Display for PublishDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishDate::Known(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            PublishDate::Unknown => f.write_str("date unknown"),
        }
    }
}

/// A successfully extracted poll. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollRecord {
    id: PollId,
    title: String,
    published: PublishDate,
    options: Vec<PollOption>,
}

impl PollRecord {
    pub fn new(
        id: PollId,
        title: impl Into<String>,
        published: PublishDate,
        options: Vec<PollOption>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            published,
            options,
        }
    }

    pub fn id(&self) -> &PollId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn published(&self) -> PublishDate {
        self.published
    }

    /// Options in display order.
    pub fn options(&self) -> &[PollOption] {
        &self.options
    }

    pub fn labels(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.label.as_str()).collect()
    }

    pub fn votes(&self) -> Vec<u64> {
        self.options.iter().map(|o| o.votes).collect()
    }

    pub fn total_votes(&self) -> u64 {
        self.options.iter().map(|o| o.votes).sum()
    }
}

/// Why a page produced no renderable poll. Expected, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NoDataReason {
    WidgetAbsent,
    NoOptions,
    MismatchedCounts { options: usize, votes: usize },
    NonNumericVote { text: String },
    TooManyOptions { count: usize, ceiling: usize },
}

impl fmt::Display for NoDataReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoDataReason::WidgetAbsent => f.write_str("page has no poll widget"),
            NoDataReason::NoOptions => f.write_str("poll widget has no options"),
            NoDataReason::MismatchedCounts { options, votes } => {
                write!(f, "{options} options but {votes} vote counts")
            }
            NoDataReason::NonNumericVote { text } => write!(f, "non-numeric vote count {text:?}"),
            NoDataReason::TooManyOptions { count, ceiling } => {
                write!(f, "{count} options exceeds palette capacity {ceiling}")
            }
        }
    }
}

/// Outcome of extracting a single poll page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Poll(PollRecord),
    NoData(NoDataReason),
}

impl Extraction {
    pub fn into_poll(self) -> Option<PollRecord> {
        match self {
            Extraction::Poll(p) => Some(p),
            Extraction::NoData(_) => None,
        }
    }
}

/// Errors that can occur while scraping and publishing polls.
#[derive(thiserror::Error, Debug)]
pub enum PollError {
    #[error("Fetch error for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PollError {
    pub fn fetch(url: &str, reason: impl fmt::Display) -> Self {
        PollError::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience result type.
pub type PollResult<T> = Result<T, PollError>;
