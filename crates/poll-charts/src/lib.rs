//! Poll charts — discover active forum polls, extract their vote tallies,
//! render a chart per poll and publish an index page linking them.

pub mod batch;
pub mod config;
pub mod discovery;
pub mod extraction;
pub mod fetch;
pub mod metadata;
pub mod publish;
pub mod render;
pub mod types;

pub use batch::{BatchReport, Pipeline, RunSummary, Skip};
pub use config::Config;
pub use discovery::{discover, find_active_polls};
pub use extraction::{extract_poll, parse_poll_page};
pub use fetch::{HttpClient, PageSource};
pub use publish::IndexPublisher;
pub use render::{ChartRenderer, Palette, SvgChartRenderer};
pub use types::*;
