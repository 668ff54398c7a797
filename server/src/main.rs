use anyhow::Result;
use axum::Router;
use clap::Parser;
use reelrank_server::{build_app, load_engine};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Catalog snapshot (JSON array or .jsonl)
    #[arg(long, default_value = "./data/catalog.jsonl")]
    catalog: String,
    /// Query log directory
    #[arg(long, default_value = "./data/query_log")]
    log_dir: String,
    /// Optional engine config (JSON)
    #[arg(long)]
    config: Option<String>,
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
    let engine = load_engine(&args.catalog, &args.log_dir, args.config.as_deref())?;
    let app: Router = build_app(Arc::new(engine));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
