//! Poll charts — entry point.

use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use poll_charts::config::{resolve_listing_url, resolve_node_url, resolve_output_dir};
use poll_charts::{
    Config, Extraction, HttpClient, IndexPublisher, Palette, Pipeline, PollId, PollResult,
    RunSummary, SvgChartRenderer,
};

#[derive(Parser)]
#[command(
    name = "poll-charts",
    about = "Scrape active forum polls and publish a chart for each",
    version
)]
struct Cli {
    /// Poll listing page.
    /// Also reads from POLL_CHARTS_LISTING_URL.
    #[arg(long, global = true)]
    listing_url: Option<String>,

    /// URL prefix that a poll id is appended to.
    /// Also reads from POLL_CHARTS_NODE_URL.
    #[arg(long, global = true)]
    node_url: Option<String>,

    /// Directory for charts and the index page.
    /// Also reads from POLL_CHARTS_OUTPUT.
    #[arg(short, long, global = true)]
    output: Option<String>,

    /// Per-request timeout in milliseconds.
    #[arg(long, global = true, default_value_t = poll_charts::config::DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Colour palette (category10, category20). Its size caps the option count.
    #[arg(long, global = true, default_value = "category20")]
    palette: Palette,

    /// Number of poll pages fetched at once.
    #[arg(long, global = true, default_value_t = 1)]
    concurrency: usize,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape, render and publish every active poll (default).
    Run,

    /// List active poll ids, one per line.
    Discover,

    /// Extract a single poll and print it as JSON.
    Show {
        /// Poll (node) id.
        id: String,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            listing_url: resolve_listing_url(self.listing_url.as_deref()),
            node_url_prefix: resolve_node_url(self.node_url.as_deref()),
            output_dir: resolve_output_dir(self.output.as_deref()),
            timeout_ms: self.timeout_ms,
            palette: self.palette,
            concurrency: self.concurrency.max(1),
        }
    }
}

fn pipeline(config: Config) -> anyhow::Result<Pipeline> {
    let http = HttpClient::new(config.timeout_ms).context("building HTTP client")?;
    let renderer = SvgChartRenderer::new(config.palette);
    let publisher = IndexPublisher::new(config.output_dir.clone());
    Ok(Pipeline::new(
        Arc::new(http),
        Arc::new(renderer),
        publisher,
        config,
    ))
}

/// Attach a neutral context to whatever stage of the run failed.
fn run_outcome(result: PollResult<RunSummary>) -> anyhow::Result<RunSummary> {
    result.context("poll run failed")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config();
    tracing::debug!(
        listing = %config.listing_url,
        output = %config.output_dir.display(),
        palette = ?config.palette,
        "resolved configuration"
    );

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let summary = run_outcome(pipeline(config)?.run().await)?;
            println!(
                "Published {} of {} active polls to {}",
                summary.published.len(),
                summary.discovered,
                summary.index_path.display()
            );
            for (id, skip) in &summary.skipped {
                println!("  skipped {id}: {skip}");
            }
        }

        Commands::Discover => {
            let ids = pipeline(config)?.discover().await?;
            for id in ids {
                println!("{id}");
            }
        }

        Commands::Show { id } => {
            let id = PollId::new(id);
            match pipeline(config)?.extract(&id).await? {
                Extraction::Poll(poll) => {
                    println!("{}", serde_json::to_string_pretty(&poll)?);
                }
                Extraction::NoData(reason) => {
                    println!("Poll {id}: no data ({reason})");
                }
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "poll-charts", &mut std::io::stdout());
        }
    }

    Ok(())
}
