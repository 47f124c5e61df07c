use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use docchat_core::config::{expand_path, Config};
use docchat_embed::get_default_gateway;
use docchat_vector::VectorStore;

/// Print the raw nearest chunks for a query, without calling the answer model.
#[derive(Parser, Debug)]
#[command(name = "docchat-search")]
struct Args {
    query: String,

    #[arg(long, default_value_t = 5)]
    limit: usize,

    /// Index path prefix (defaults to `data.index_path`)
    #[arg(long, env = "DOCCHAT_INDEX")]
    index: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let settings = Config::load()?.settings()?;
    let index: PathBuf = args.index.as_deref().map(expand_path).unwrap_or_else(|| settings.index_path());

    let mut store = VectorStore::new(get_default_gateway(&settings)?);
    store.restore(&index).with_context(|| format!("no usable index at {}", index.display()))?;

    println!("🔍 docchat-search\n================");
    println!("Query: {}", args.query);
    println!("Index: {} ({} chunks)", index.display(), store.len());
    let results = store.search(&args.query, args.limit)?;
    println!("\n🔍 Found {} results for: \"{}\"", results.len(), args.query);
    for (i, r) in results.iter().enumerate() {
        println!(
            "\n  {}. similarity={:.4}  source={}  chunk={}",
            i + 1,
            r.similarity,
            r.source(),
            r.metadata.chunk_index
        );
        println!("     📝 Content: {}", r.text);
    }
    Ok(())
}
