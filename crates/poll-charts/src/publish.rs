//! Navigation page and JSON manifest for the rendered charts.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::render::{chart_href, escape_html};
use crate::types::{PollRecord, PollResult};

pub const INDEX_FILE: &str = "index.html";
pub const MANIFEST_FILE: &str = "polls.json";

/// Writes `index.html` and `polls.json` into the output directory.
#[derive(Debug, Clone)]
pub struct IndexPublisher {
    out_dir: PathBuf,
}

#[derive(Serialize)]
struct Manifest<'a> {
    generated_at: DateTime<Utc>,
    polls: Vec<ManifestEntry<'a>>,
}

#[derive(Serialize)]
struct ManifestEntry<'a> {
    #[serde(flatten)]
    poll: &'a PollRecord,
    total_votes: u64,
    chart: String,
}

impl IndexPublisher {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Publish `polls` in the given order. Returns the index page path.
    pub fn publish(&self, polls: &[PollRecord], generated_at: DateTime<Utc>) -> PollResult<PathBuf> {
        std::fs::create_dir_all(&self.out_dir)?;

        let index = self.out_dir.join(INDEX_FILE);
        std::fs::write(&index, index_page(polls, generated_at))?;

        let manifest = Manifest {
            generated_at,
            polls: polls
                .iter()
                .map(|poll| ManifestEntry {
                    poll,
                    total_votes: poll.total_votes(),
                    chart: chart_href(poll),
                })
                .collect(),
        };
        let json = serde_json::to_vec_pretty(&manifest)?;
        std::fs::write(self.out_dir.join(MANIFEST_FILE), json)?;

        tracing::info!(count = polls.len(), path = %index.display(), "published index");
        Ok(index)
    }
}

/// HTML list linking every poll to its chart, stamped with `generated_at`.
pub fn index_page(polls: &[PollRecord], generated_at: DateTime<Utc>) -> String {
    let mut items = String::new();
    for poll in polls {
        let _ = writeln!(
            items,
            "<li><a href=\"{href}\">{title}</a> <small>({published}, {total} votes)</small></li>",
            href = chart_href(poll),
            title = escape_html(poll.title()),
            published = poll.published(),
            total = poll.total_votes(),
        );
    }
    let body = if polls.is_empty() {
        "<p>No active polls.</p>\n".to_string()
    } else {
        format!("<ul>\n{items}</ul>\n")
    };

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Active polls</title>\n</head>\n<body>\n<h1>Active polls</h1>\n{body}\
         <p>Last updated: {stamp}</p>\n</body>\n</html>\n",
        stamp = generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}
