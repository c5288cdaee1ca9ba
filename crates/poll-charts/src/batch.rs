//! Batch orchestration: discover, extract each poll, render, publish.
//!
//! Logging context is owned by the [`Pipeline`]: every run gets its own
//! `poll_run` span carrying a run id, and all per-poll work is recorded
//! inside it.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{Instrument, Span};

use crate::config::Config;
use crate::discovery::discover;
use crate::extraction::extract_poll;
use crate::fetch::PageSource;
use crate::publish::IndexPublisher;
use crate::render::{prune_charts, ChartRenderer};
use crate::types::{Extraction, NoDataReason, PollId, PollRecord, PollResult};

/// Why a discovered poll is missing from the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Skip {
    NoData { reason: NoDataReason },
    Failed { error: String },
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skip::NoData { reason } => write!(f, "no data: {reason}"),
            Skip::Failed { error } => write!(f, "failed: {error}"),
        }
    }
}

/// Extraction results for a list of ids, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Polls that extracted cleanly.
    pub polls: Vec<PollRecord>,
    /// Polls left out, with the reason.
    pub skipped: Vec<(PollId, Skip)>,
}

/// What a full run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Id of the run's logging span.
    pub run_id: String,
    /// Active polls found on the listing.
    pub discovered: usize,
    /// Polls linked from the index, in discovery order.
    pub published: Vec<PollId>,
    /// Polls that had no data or failed to extract or render.
    pub skipped: Vec<(PollId, Skip)>,
    /// Path of the written index page.
    pub index_path: PathBuf,
}

/// One scrape-and-publish run over injected collaborators.
pub struct Pipeline {
    source: Arc<dyn PageSource>,
    renderer: Arc<dyn ChartRenderer>,
    publisher: IndexPublisher,
    config: Config,
    run_id: String,
    span: Span,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn PageSource>,
        renderer: Arc<dyn ChartRenderer>,
        publisher: IndexPublisher,
        config: Config,
    ) -> Self {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("poll_run", run_id = %run_id);
        Self {
            source,
            renderer,
            publisher,
            config,
            run_id,
            span,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Active poll ids from the listing page. Failure here is fatal to a run.
    pub async fn discover(&self) -> PollResult<Vec<PollId>> {
        discover(self.source.as_ref(), &self.config.listing_url)
            .instrument(self.span.clone())
            .await
    }

    /// Extract a single poll.
    pub async fn extract(&self, id: &PollId) -> PollResult<Extraction> {
        let url = self.config.detail_url(id);
        let span = tracing::info_span!(parent: &self.span, "poll", id = %id);
        extract_poll(
            self.source.as_ref(),
            id,
            &url,
            self.renderer.palette_capacity(),
        )
        .instrument(span)
        .await
    }

    /// Extract every id. One poll failing never stops the others.
    pub async fn extract_all(&self, ids: &[PollId]) -> BatchReport {
        let concurrency = self.config.concurrency.max(1);
        // `buffered` yields in input order regardless of completion order.
        let outcomes: Vec<(PollId, PollResult<Extraction>)> = stream::iter(ids)
            .map(|id| async move { (id.clone(), self.extract(id).await) })
            .buffered(concurrency)
            .collect()
            .await;

        let _entered = self.span.enter();
        let mut report = BatchReport::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(Extraction::Poll(poll)) => {
                    tracing::debug!(poll = %id, options = poll.options().len(), "extracted poll");
                    report.polls.push(poll);
                }
                Ok(Extraction::NoData(reason)) => {
                    tracing::info!(poll = %id, %reason, "skipping poll with no data");
                    report.skipped.push((id, Skip::NoData { reason }));
                }
                Err(e) => {
                    tracing::warn!(poll = %id, error = %e, "poll extraction failed");
                    report.skipped.push((
                        id,
                        Skip::Failed {
                            error: e.to_string(),
                        },
                    ));
                }
            }
        }
        report
    }

    /// Discover, extract, render each chart, then publish the index.
    pub async fn run(&self) -> PollResult<RunSummary> {
        let ids = self.discover().await?;
        let discovered = ids.len();
        let BatchReport { polls, mut skipped } = self.extract_all(&ids).await;

        let _entered = self.span.enter();
        let out_dir = self.publisher.out_dir();
        let mut rendered = Vec::with_capacity(polls.len());
        for poll in polls {
            match self.renderer.render(&poll, out_dir) {
                Ok(_) => rendered.push(poll),
                Err(e) => {
                    tracing::warn!(poll = %poll.id(), error = %e, "chart rendering failed");
                    skipped.push((
                        poll.id().clone(),
                        Skip::Failed {
                            error: e.to_string(),
                        },
                    ));
                }
            }
        }

        match prune_charts(out_dir, &rendered) {
            Ok(0) => {}
            Ok(removed) => tracing::info!(removed, "removed stale charts"),
            Err(e) => tracing::warn!(error = %e, "could not remove stale charts"),
        }

        let index_path = self.publisher.publish(&rendered, Utc::now())?;
        tracing::info!(
            discovered,
            published = rendered.len(),
            skipped = skipped.len(),
            "run complete"
        );

        Ok(RunSummary {
            run_id: self.run_id.clone(),
            discovered,
            published: rendered.iter().map(|p| p.id().clone()).collect(),
            skipped,
            index_path,
        })
    }
}
