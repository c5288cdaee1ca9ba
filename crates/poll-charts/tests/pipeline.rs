//! End-to-end pipeline tests against an in-memory page source.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use poll_charts::*;

const LISTING: &str = "http://forum.test/forum/polls";
const NODE: &str = "http://forum.test/node/";

// ─────────────────────── helpers ───────────────────────

/// Serves canned pages; unknown URLs fail like a network error.
#[derive(Default)]
struct MemorySource {
    pages: HashMap<String, String>,
    delays: HashMap<String, u64>,
}

impl MemorySource {
    fn page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    fn delay(mut self, url: &str, ms: u64) -> Self {
        self.delays.insert(url.to_string(), ms);
        self
    }
}

#[async_trait]
impl PageSource for MemorySource {
    async fn fetch(&self, url: &str) -> PollResult<String> {
        if let Some(ms) = self.delays.get(url) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| PollError::fetch(url, "connection refused"))
    }
}

/// Renderer that always fails.
struct BrokenRenderer;

impl ChartRenderer for BrokenRenderer {
    fn palette_capacity(&self) -> usize {
        20
    }

    fn render(&self, _poll: &PollRecord, _out_dir: &Path) -> PollResult<PathBuf> {
        Err(PollError::Io(std::io::Error::other("disk full")))
    }
}

fn listing(rows: &[(&str, bool)]) -> String {
    let rows: String = rows
        .iter()
        .map(|(id, expired)| {
            let marker = if *expired {
                r#"<span class="marker expired">expired</span> "#
            } else {
                ""
            };
            format!(r#"<tr><td class="topic">{marker}<a href="/node/{id}">Poll {id}</a></td></tr>"#)
        })
        .collect();
    format!("<html><body><table>{rows}</table></body></html>")
}

fn poll_page(title: &str, options: &[(&str, &str)]) -> String {
    let items: String = options
        .iter()
        .map(|(label, votes)| {
            format!(
                r#"<div><span class="polltext">{label}</span><span class="nvb voteup">{votes}</span></div>"#
            )
        })
        .collect();
    format!(
        r#"<html><head><title>{title} - OzBargain</title></head>
        <body><div id="poll">{items}</div></body></html>"#
    )
}

fn node(id: &str) -> String {
    format!("{NODE}{id}")
}

fn config(out: &Path, concurrency: usize) -> Config {
    Config {
        listing_url: LISTING.to_string(),
        node_url_prefix: NODE.to_string(),
        output_dir: out.to_path_buf(),
        concurrency,
        ..Config::default()
    }
}

fn pipeline(source: MemorySource, out: &Path, concurrency: usize) -> Pipeline {
    Pipeline::new(
        Arc::new(source),
        Arc::new(SvgChartRenderer::default()),
        IndexPublisher::new(out),
        config(out, concurrency),
    )
}

fn scenario() -> MemorySource {
    MemorySource::default()
        .page(
            LISTING,
            listing(&[("101", false), ("102", true), ("103", false), ("104", false)]),
        )
        .page(&node("101"), poll_page("Best Deal Poll", &[("Yes", "12"), ("No", "4")]))
        .page(&node("103"), poll_page("Broken Poll", &[("A", "1"), ("B", "N/A")]))
        .page(&node("104"), poll_page("Favourite Shop", &[("Coles", "3"), ("Aldi", "9")]))
}

fn ids(v: &[PollId]) -> Vec<&str> {
    v.iter().map(PollId::as_str).collect()
}

// ═══════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_discovery_excludes_expired() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(scenario(), dir.path(), 1);
    assert_eq!(ids(&p.discover().await.unwrap()), vec!["101", "103", "104"]);
}

#[tokio::test]
async fn test_end_to_end_publishes_only_valid_polls() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(scenario(), dir.path(), 1);

    let summary = p.run().await.unwrap();
    assert_eq!(summary.discovered, 3);
    assert_eq!(ids(&summary.published), vec!["101", "104"]);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].0.as_str(), "103");
    assert!(matches!(
        summary.skipped[0].1,
        Skip::NoData {
            reason: NoDataReason::NonNumericVote { .. }
        }
    ));

    let index = std::fs::read_to_string(&summary.index_path).unwrap();
    assert_eq!(index.matches("<li>").count(), 2);
    assert!(index.contains(r#"href="charts/101.html""#));
    assert!(index.contains(r#"href="charts/104.html""#));
    assert!(!index.contains("charts/103.html"));
    assert!(index.contains("Best Deal Poll"));
    assert!(index.contains("Last updated:"));

    assert!(dir.path().join("charts/101.html").exists());
    assert!(dir.path().join("charts/104.html").exists());
    assert!(!dir.path().join("charts/103.html").exists());
}

#[tokio::test]
async fn test_run_removes_charts_of_expired_polls() {
    let dir = tempfile::tempdir().unwrap();
    let charts = dir.path().join("charts");
    std::fs::create_dir_all(&charts).unwrap();
    std::fs::write(charts.join("102.html"), "from an earlier run").unwrap();
    std::fs::write(charts.join("103.html"), "from an earlier run").unwrap();

    let p = pipeline(scenario(), dir.path(), 1);
    p.run().await.unwrap();

    let mut left: Vec<String> = std::fs::read_dir(&charts)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(left, vec!["101.html", "104.html"]);
}

#[tokio::test]
async fn test_listing_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(MemorySource::default(), dir.path(), 1);
    let err = p.run().await.unwrap_err();
    assert!(matches!(err, PollError::Fetch { .. }));
    assert!(!dir.path().join("index.html").exists());
}

#[tokio::test]
async fn test_unrecognized_listing_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let source = MemorySource::default().page(LISTING, "<html><body>Down for maintenance</body></html>");
    let p = pipeline(source, dir.path(), 1);
    assert!(matches!(p.run().await.unwrap_err(), PollError::Parse(_)));
}

#[tokio::test]
async fn test_single_fetch_failure_does_not_abort_batch() {
    let dir = tempfile::tempdir().unwrap();
    let source = MemorySource::default()
        .page(LISTING, listing(&[("1", false), ("2", false), ("3", false)]))
        .page(&node("1"), poll_page("One", &[("A", "1")]))
        .page(&node("3"), poll_page("Three", &[("A", "3")]));
    let p = pipeline(source, dir.path(), 1);

    let report = p
        .extract_all(&[PollId::new("1"), PollId::new("2"), PollId::new("3")])
        .await;
    assert_eq!(
        report.polls.iter().map(|p| p.title()).collect::<Vec<_>>(),
        vec!["One", "Three"]
    );
    assert_eq!(report.skipped.len(), 1);
    assert!(matches!(report.skipped[0].1, Skip::Failed { .. }));
}

#[tokio::test]
async fn test_non_poll_node_is_no_data() {
    let dir = tempfile::tempdir().unwrap();
    let source = MemorySource::default().page(
        &node("55"),
        "<html><head><title>Cheap TV - OzBargain</title></head><body>deal</body></html>",
    );
    let p = pipeline(source, dir.path(), 1);
    assert_eq!(
        p.extract(&PollId::new("55")).await.unwrap(),
        Extraction::NoData(NoDataReason::WidgetAbsent)
    );
}

#[tokio::test]
async fn test_concurrent_extraction_keeps_discovery_order() {
    let dir = tempfile::tempdir().unwrap();
    let source = MemorySource::default()
        .page(&node("a"), poll_page("Slow", &[("x", "1")]))
        .page(&node("b"), poll_page("Medium", &[("x", "2")]))
        .page(&node("c"), poll_page("Fast", &[("x", "3")]))
        .delay(&node("a"), 60)
        .delay(&node("b"), 30);
    let p = pipeline(source, dir.path(), 3);

    let report = p
        .extract_all(&[PollId::new("a"), PollId::new("b"), PollId::new("c")])
        .await;
    assert_eq!(
        report.polls.iter().map(|p| p.title()).collect::<Vec<_>>(),
        vec!["Slow", "Medium", "Fast"]
    );
}

#[tokio::test]
async fn test_render_failure_excluded_from_index() {
    let dir = tempfile::tempdir().unwrap();
    let p = Pipeline::new(
        Arc::new(scenario()),
        Arc::new(BrokenRenderer),
        IndexPublisher::new(dir.path()),
        config(dir.path(), 1),
    );

    let summary = p.run().await.unwrap();
    assert!(summary.published.is_empty());
    assert_eq!(summary.skipped.len(), 3);
    let index = std::fs::read_to_string(summary.index_path).unwrap();
    assert!(index.contains("No active polls."));
}

#[tokio::test]
async fn test_ceiling_comes_from_renderer() {
    let dir = tempfile::tempdir().unwrap();
    let eleven: Vec<(String, String)> = (0..11).map(|i| (format!("o{i}"), "1".to_string())).collect();
    let eleven: Vec<(&str, &str)> = eleven.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
    let source = MemorySource::default().page(&node("big"), poll_page("Big", &eleven));

    let narrow = Pipeline::new(
        Arc::new(source),
        Arc::new(SvgChartRenderer::new(Palette::Category10)),
        IndexPublisher::new(dir.path()),
        config(dir.path(), 1),
    );
    assert_eq!(
        narrow.extract(&PollId::new("big")).await.unwrap(),
        Extraction::NoData(NoDataReason::TooManyOptions {
            count: 11,
            ceiling: 10
        })
    );
}

#[tokio::test]
async fn test_manifest_matches_index() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(scenario(), dir.path(), 2);
    p.run().await.unwrap();

    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("polls.json")).unwrap())
            .unwrap();
    let polls = manifest["polls"].as_array().unwrap();
    assert_eq!(polls.len(), 2);
    assert_eq!(polls[0]["id"], "101");
    assert_eq!(polls[0]["title"], "Best Deal Poll");
    assert_eq!(polls[0]["published"]["kind"], "unknown");
    assert_eq!(polls[1]["id"], "104");
}
