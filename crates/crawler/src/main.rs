//! CiteForge Crawler
//!
//! Command line entry point:
//! - `build`: citation network around a root work, saved as JSON
//! - `download`: open-access PDFs for the works of a saved network

mod commands;
mod services;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use citeforge_common::config::{AppConfig, CrawlConfig, ObservabilityConfig};
use citeforge_common::{metrics, VERSION};
use citeforge_network::BuildParams;
use services::Services;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "citeforge")]
#[command(version, about = "Build OpenAlex citation networks and fetch open-access papers")]
struct Cli {
    /// Configuration file (defaults to config/ + APP__ environment)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the citation network around a work
    Build(BuildArgs),

    /// Download papers for every work of a saved network
    Download {
        /// Network file written by `build`
        network: PathBuf,
    },
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Root work (`W123` or an OpenAlex URL)
    root: String,

    /// Hops expanded from the root
    #[arg(long)]
    depth: Option<usize>,

    /// Citations and references requested per node
    #[arg(long)]
    limit: Option<usize>,

    /// Nodes expanded concurrently
    #[arg(long)]
    concurrency: Option<usize>,

    /// Stop adding nodes after this many
    #[arg(long)]
    max_nodes: Option<usize>,

    /// Output directory (defaults to the data directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also download papers and write the work DOI map
    #[arg(short, long)]
    download: bool,
}

impl BuildArgs {
    fn params(&self, crawl: &CrawlConfig) -> BuildParams {
        let defaults = BuildParams::from(crawl);
        BuildParams {
            max_depth: self.depth.unwrap_or(defaults.max_depth),
            per_node_limit: self.limit.unwrap_or(defaults.per_node_limit),
            max_concurrency: self.concurrency.unwrap_or(defaults.max_concurrency),
            max_nodes: self.max_nodes.or(defaults.max_nodes),
        }
    }
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load()?,
    };

    init_tracing(&config.observability);
    metrics::register_metrics();

    info!("Starting CiteForge crawler v{}", VERSION);

    let services = Services::connect(&config).await?;

    match cli.command {
        Command::Build(args) => {
            let params = args.params(&config.crawl);
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| services.data_dir.clone());
            commands::build(&services, &args.root, &params, &output, args.download).await?;
        }
        Command::Download { network } => {
            commands::download(&services, &network).await?;
        }
    }

    info!("Crawler finished");
    Ok(())
}
