//! Chart rendering: one standalone HTML page with an inline SVG bar chart per poll.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::types::{PollError, PollRecord, PollResult};

/// Directory, relative to the output root, that holds chart pages.
pub const CHARTS_DIR: &str = "charts";

const CATEGORY10: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const CATEGORY20: &[&str] = &[
    "#1f77b4", "#aec7e8", "#ff7f0e", "#ffbb78", "#2ca02c", "#98df8a", "#d62728", "#ff9896",
    "#9467bd", "#c5b0d5", "#8c564b", "#c49c94", "#e377c2", "#f7b6d2", "#7f7f7f", "#c7c7c7",
    "#bcbd22", "#dbdb8d", "#17becf", "#9edae5",
];

/// Discrete colour scheme. Its size is the option ceiling for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Palette {
    Category10,
    #[default]
    Category20,
}

impl Palette {
    pub fn colors(&self) -> &'static [&'static str] {
        match self {
            Palette::Category10 => CATEGORY10,
            Palette::Category20 => CATEGORY20,
        }
    }

    pub fn capacity(&self) -> usize {
        self.colors().len()
    }
}

impl FromStr for Palette {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "category10" | "10" => Ok(Palette::Category10),
            "category20" | "20" => Ok(Palette::Category20),
            other => Err(format!(
                "unknown palette {other:?} (expected category10 or category20)"
            )),
        }
    }
}

/// Produces one chart artifact per poll.
pub trait ChartRenderer: Send + Sync {
    /// Most options this renderer can colour without repeating a colour.
    fn palette_capacity(&self) -> usize;

    /// Write the chart for `poll` under `out_dir` and return its path.
    fn render(&self, poll: &PollRecord, out_dir: &Path) -> PollResult<PathBuf>;
}

/// Renders `charts/<id>.html` pages containing an SVG bar chart.
#[derive(Debug, Clone, Default)]
pub struct SvgChartRenderer {
    palette: Palette,
}

impl SvgChartRenderer {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn palette_capacity(&self) -> usize {
        self.palette.capacity()
    }

    fn render(&self, poll: &PollRecord, out_dir: &Path) -> PollResult<PathBuf> {
        let path = chart_path(out_dir, poll)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, chart_page(poll, self.palette))?;
        tracing::info!(poll = %poll.id(), path = %path.display(), "generated chart");
        Ok(path)
    }
}

/// Remove chart pages under `out_dir` whose poll is not in `keep`.
///
/// Returns how many stale pages were deleted. A missing charts directory is
/// not an error.
pub fn prune_charts(out_dir: &Path, keep: &[PollRecord]) -> PollResult<usize> {
    let dir = out_dir.join(CHARTS_DIR);
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("html") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if keep.iter().any(|p| p.id().as_str() == stem) {
            continue;
        }
        std::fs::remove_file(&path)?;
        tracing::debug!(path = %path.display(), "removed stale chart");
        removed += 1;
    }
    Ok(removed)
}

/// Relative link from the output root to a poll's chart page.
pub fn chart_href(poll: &PollRecord) -> String {
    format!("{CHARTS_DIR}/{}.html", poll.id())
}

fn chart_path(out_dir: &Path, poll: &PollRecord) -> PollResult<PathBuf> {
    let id = poll.id().as_str();
    if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
        return Err(PollError::Parse(format!(
            "poll id {id:?} is not usable as a file name"
        )));
    }
    Ok(out_dir.join(CHARTS_DIR).join(format!("{id}.html")))
}

/// Standalone HTML page wrapping the chart.
pub fn chart_page(poll: &PollRecord, palette: Palette) -> String {
    let title = escape_html(poll.title());
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n\
         <p>Published: {published} &middot; Total votes: {total}</p>\n{svg}\n\
         <p><a href=\"../index.html\">All polls</a></p>\n</body>\n</html>\n",
        published = poll.published(),
        total = poll.total_votes(),
        svg = chart_svg(poll, palette),
    )
}

const PLOT_HEIGHT: u32 = 250;
const SLOT_WIDTH: u32 = 80;
const MARGIN_LEFT: u32 = 60;
const MARGIN_TOP: u32 = 30;
const MARGIN_BOTTOM: u32 = 60;

/// Vertical bar chart, one bar per option in display order, y axis from zero.
pub fn chart_svg(poll: &PollRecord, palette: Palette) -> String {
    let options = poll.options();
    let colors = palette.colors();
    let plot_width = SLOT_WIDTH * options.len().max(1) as u32;
    let width = MARGIN_LEFT + plot_width + 20;
    let height = MARGIN_TOP + PLOT_HEIGHT + MARGIN_BOTTOM;
    let max = options.iter().map(|o| o.votes).max().unwrap_or(0).max(1);
    let base_y = MARGIN_TOP + PLOT_HEIGHT;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="sans-serif">"#
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="18" text-anchor="middle" font-size="14">{}</text>"#,
        width / 2,
        escape_html(poll.title())
    );
    let _ = writeln!(
        svg,
        r##"<line x1="{MARGIN_LEFT}" y1="{MARGIN_TOP}" x2="{MARGIN_LEFT}" y2="{base_y}" stroke="#333"/>"##
    );
    let _ = writeln!(
        svg,
        r##"<line x1="{MARGIN_LEFT}" y1="{base_y}" x2="{}" y2="{base_y}" stroke="#333"/>"##,
        MARGIN_LEFT + plot_width
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{base_y}" text-anchor="end" font-size="10">0</text>"#,
        MARGIN_LEFT - 4
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="end" font-size="10">{max}</text>"#,
        MARGIN_LEFT - 4,
        MARGIN_TOP + 4
    );

    for (i, option) in options.iter().enumerate() {
        let bar_height = (option.votes as f64 / max as f64 * PLOT_HEIGHT as f64).round() as u32;
        let x = MARGIN_LEFT + SLOT_WIDTH * i as u32 + 10;
        let center = x + (SLOT_WIDTH - 20) / 2;
        let _ = writeln!(
            svg,
            r#"<rect x="{x}" y="{}" width="{}" height="{bar_height}" fill="{}"><title>{}: {}</title></rect>"#,
            base_y - bar_height,
            SLOT_WIDTH - 20,
            colors[i % colors.len()],
            escape_html(&option.label),
            option.votes
        );
        let _ = writeln!(
            svg,
            r#"<text x="{center}" y="{}" text-anchor="middle" font-size="10">{}</text>"#,
            base_y - bar_height - 3,
            option.votes
        );
        let _ = writeln!(
            svg,
            r#"<text x="{center}" y="{}" text-anchor="middle" font-size="10">{}</text>"#,
            base_y + 14,
            escape_html(&option.label)
        );
    }

    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-size="12">Options</text>"#,
        MARGIN_LEFT + plot_width / 2,
        height - 12
    );
    let _ = writeln!(
        svg,
        r#"<text x="16" y="{}" text-anchor="middle" font-size="12" transform="rotate(-90 16 {})">Votes</text>"#,
        MARGIN_TOP + PLOT_HEIGHT / 2,
        MARGIN_TOP + PLOT_HEIGHT / 2
    );
    svg.push_str("</svg>");
    svg
}

/// Escape text for HTML element content and quoted attributes.
pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
