use anyhow::{anyhow, Result};
use axum::Router;
use clap::Parser;
use server::{build_app, CommandTagger, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index file built by `indexer build`
    #[arg(long, default_value = "./caption_index.bin")]
    index: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 5002)]
    port: u16,
    /// Tagger command line; `{image}` and `{dir}` are substituted per upload
    #[arg(long, default_value = "deepdanbooru evaluate {dir} --project-path ./deepdanbooru-project --allow-folder --save-txt")]
    tagger_cmd: String,
    /// Largest accepted upload in bytes
    #[arg(long, default_value_t = 16 * 1024 * 1024)]
    max_upload_bytes: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let tagger = CommandTagger::parse(&args.tagger_cmd).ok_or_else(|| anyhow!("--tagger-cmd is empty"))?;
    let config = ServerConfig { index_path: args.index, tagger: Arc::new(tagger), max_upload_bytes: args.max_upload_bytes };
    let app: Router = build_app(config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
