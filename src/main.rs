mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cvsearch::config::CvConfig;

#[derive(Parser)]
#[command(name = "cvsearch", version, about = "Resume retrieval over an exact vector index")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Embed .txt/.md documents (files or directories) and add them to the store
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Find the documents most similar to a query
    Search {
        query: String,
        /// Maximum number of results
        #[arg(long)]
        top_k: Option<usize>,
        /// Minimum similarity score
        #[arg(long)]
        threshold: Option<f32>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a stored document by id
    Inspect { id: usize },
    /// Show store statistics and check index/metadata alignment
    Stats,
    /// Delete the index and metadata files
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the configured embedding model to ~/.cvsearch/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = CvConfig::load()?;

    // Log to stderr so stdout stays clean for --json output.
    let filter = EnvFilter::try_new(&config.logging.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Ingest { paths } => cli::ingest::ingest(&config, &paths).await?,
        Command::Search {
            query,
            top_k,
            threshold,
            json,
        } => {
            let mut options = config.search_options();
            if let Some(k) = top_k {
                options.top_k = k;
            }
            if let Some(t) = threshold {
                options.threshold = t;
            }
            cli::search::search(&config, &query, options, json).await?;
        }
        Command::Inspect { id } => cli::inspect::inspect(&config, id)?,
        Command::Stats => cli::stats::stats(&config)?,
        Command::Reset { yes } => cli::reset::reset(&config, yes)?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
    }

    Ok(())
}
