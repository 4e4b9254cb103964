use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tagsim_core::persist::{load_index, load_manifest, save_index, save_manifest, IndexManifest};
use tagsim_core::{build_index, query, DEFAULT_K};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and inspect the caption similarity index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a directory of `<stem>.txt` caption files
    Build {
        /// Caption directory
        #[arg(long)]
        input: String,
        /// Output index file
        #[arg(long, default_value = "./caption_index.bin")]
        output: String,
        /// Extension of the image each caption describes; ids become `<stem>.<ext>`
        #[arg(long, default_value = "png")]
        image_ext: String,
    },
    /// Validate an index file and print a summary
    Inspect {
        #[arg(long, default_value = "./caption_index.bin")]
        index: String,
    },
    /// Rank indexed images against a caption
    Query {
        #[arg(long, default_value = "./caption_index.bin")]
        index: String,
        /// Comma-space separated tags, e.g. "1girl, smile"
        #[arg(long)]
        caption: String,
        /// Document id to leave out of the results
        #[arg(long)]
        exclude: Option<String>,
        #[arg(short, long, default_value_t = DEFAULT_K)]
        k: usize,
    },
}

#[derive(Serialize)]
struct Summary {
    num_docs: usize,
    num_terms: usize,
    tokenizer: &'static str,
    manifest: Option<IndexManifest>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, image_ext } => build(&input, &output, &image_ext),
        Commands::Inspect { index } => inspect(&index),
        Commands::Query { index, caption, exclude, k } => run_query(&index, &caption, exclude.as_deref(), k),
    }
}

fn build(input: &str, output: &str, image_ext: &str) -> Result<()> {
    let index = build_index(input, image_ext)?;
    save_index(output, &index)?;
    let manifest = IndexManifest::describe(
        &index,
        time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_else(|_| "".into()),
    );
    save_manifest(output, &manifest)?;
    tracing::info!(output, num_docs = manifest.num_docs, num_terms = manifest.num_terms, "index build complete");
    Ok(())
}

fn inspect(path: &str) -> Result<()> {
    let index = load_index(path)?;
    let manifest = match load_manifest(path) {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = %e, "no readable manifest next to index");
            None
        }
    };
    let summary = Summary { num_docs: index.num_docs(), num_terms: index.num_terms(), tokenizer: index.space.tokenizer.id(), manifest };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_query(path: &str, caption: &str, exclude: Option<&str>, k: usize) -> Result<()> {
    let index = load_index(path)?;
    for hit in query(&index, caption.trim(), exclude, k) {
        println!("{:.6}\t{}", hit.score, hit.id);
    }
    Ok(())
}
