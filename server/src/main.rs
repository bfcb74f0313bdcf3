use anyhow::Result;
use clap::Parser;
use engine::{EngineConfig, SearchEngine};
use server::{build_app, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// JSON engine configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Index directory (overrides the configured one)
    #[arg(long)]
    index: Option<PathBuf>,
    /// Document root used by rebuilds
    #[arg(long, default_value = "./documents")]
    docs: PathBuf,
    /// Build the index at startup when no snapshot could be loaded
    #[arg(long, default_value_t = false)]
    build_on_start: bool,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(index) = args.index {
        config.index_dir = index;
    }
    let engine = Arc::new(SearchEngine::open(config)?);

    if args.build_on_start && !engine.health().ready {
        let (e, root) = (engine.clone(), args.docs.clone());
        match tokio::task::spawn_blocking(move || e.rebuild_index(&root)).await? {
            Ok(summary) => tracing::info!(num_docs = summary.documents_count, "initial build complete"),
            Err(err) => tracing::warn!(error = %err, "initial build failed; serving without an index"),
        }
    }

    let app = build_app(AppState { engine, docs_root: args.docs });
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
