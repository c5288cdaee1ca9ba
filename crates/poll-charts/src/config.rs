//! Configuration loading and resolution.

use std::path::PathBuf;

use crate::render::Palette;
use crate::types::PollId;

pub const DEFAULT_LISTING_URL: &str = "https://www.ozbargain.com.au/forum/polls";
pub const DEFAULT_NODE_URL: &str = "https://www.ozbargain.com.au/node/";
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

pub const LISTING_URL_ENV: &str = "POLL_CHARTS_LISTING_URL";
pub const NODE_URL_ENV: &str = "POLL_CHARTS_NODE_URL";
pub const OUTPUT_DIR_ENV: &str = "POLL_CHARTS_OUTPUT";

/// Everything a run needs to know.
#[derive(Debug, Clone)]
pub struct Config {
    pub listing_url: String,
    pub node_url_prefix: String,
    pub output_dir: PathBuf,
    pub timeout_ms: u64,
    pub palette: Palette,
    /// Polls extracted at once. 1 means strictly sequential.
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            node_url_prefix: DEFAULT_NODE_URL.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            palette: Palette::default(),
            concurrency: 1,
        }
    }
}

impl Config {
    /// Detail page URL for a poll id.
    pub fn detail_url(&self, id: &PollId) -> String {
        let prefix = self.node_url_prefix.trim_end_matches('/');
        format!("{prefix}/{id}")
    }
}

/// Resolve the listing URL: explicit flag, then env var, then default.
pub fn resolve_listing_url(explicit: Option<&str>) -> String {
    resolve(explicit, LISTING_URL_ENV, DEFAULT_LISTING_URL)
}

/// Resolve the node URL prefix: explicit flag, then env var, then default.
pub fn resolve_node_url(explicit: Option<&str>) -> String {
    resolve(explicit, NODE_URL_ENV, DEFAULT_NODE_URL)
}

/// Resolve the output directory: explicit flag, then env var, then default.
pub fn resolve_output_dir(explicit: Option<&str>) -> PathBuf {
    PathBuf::from(resolve(explicit, OUTPUT_DIR_ENV, DEFAULT_OUTPUT_DIR))
}

fn resolve(explicit: Option<&str>, env_key: &str, default: &str) -> String {
    if let Some(value) = explicit {
        return value.to_string();
    }

    if let Ok(value) = std::env::var(env_key) {
        if !value.trim().is_empty() {
            return value;
        }
    }

    default.to_string()
}
