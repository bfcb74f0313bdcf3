use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use engine::{EngineConfig, SearchEngine};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query a BM25 index over Chinese documents", long_about = None)]
struct Cli {
    /// JSON engine configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Index directory (overrides the configured one)
    #[arg(long, global = true)]
    index: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a directory of documents
    Build {
        /// Document root
        #[arg(long)]
        input: PathBuf,
    },
    /// Run a ranked query
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
        /// Include a snippet for every hit
        #[arg(long, default_value_t = false)]
        snippets: bool,
    },
    /// Corpus statistics
    Stats,
    /// Frequency and IDF of one term
    Term { term: String },
    /// Documents sharing the most terms with a document
    Similar {
        doc_id: u32,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Metadata and top terms of one document
    Doc {
        doc_id: u32,
        #[arg(long, default_value_t = false)]
        content: bool,
    },
    /// Show how a query is tokenized and how rare its terms are
    Analyze { query: String },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(index) = cli.index {
        config.index_dir = index;
    }
    let engine = SearchEngine::open(config)?;

    match cli.command {
        Commands::Build { input } => {
            let summary = engine.rebuild_index(&input)?;
            tracing::info!(
                num_docs = summary.documents_count,
                num_terms = summary.vocabulary_size,
                skipped = summary.skipped.len(),
                "index build complete"
            );
            print_json(&summary)
        }
        Commands::Search { query, limit, snippets } => {
            require_ready(&engine)?;
            print_json(&engine.search(&query, limit, snippets)?)
        }
        Commands::Stats => {
            require_ready(&engine)?;
            print_json(&engine.stats()?)
        }
        Commands::Term { term } => {
            require_ready(&engine)?;
            print_json(&engine.term_stats(&term)?)
        }
        Commands::Similar { doc_id, limit } => {
            require_ready(&engine)?;
            print_json(&engine.similar(doc_id, limit)?)
        }
        Commands::Doc { doc_id, content } => {
            require_ready(&engine)?;
            print_json(&engine.document(doc_id, content)?)
        }
        Commands::Analyze { query } => {
            require_ready(&engine)?;
            print_json(&engine.analyze_query(&query)?)
        }
    }
}

fn require_ready(engine: &SearchEngine) -> Result<()> {
    if !engine.health().ready {
        bail!("no usable index at {}; run `indexer build --input <dir>` first", engine.config().index_dir.display());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
