use anyhow::Result;
use clap::Parser;
use newsdex_core::{Config, DocumentStore};
use newsdex_crawler::fetch::HttpFetcher;
use newsdex_crawler::Crawler;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Fetch news articles into the document store")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "./newsdex.toml")]
    config: PathBuf,
    /// Override `[crawl] target_count`
    #[arg(long)]
    target_count: Option<usize>,
    /// Override `[crawl] concurrency`
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();
    let mut config = Config::load(&args.config)?;
    if let Some(n) = args.target_count {
        config.crawl.target_count = n;
    }
    if let Some(n) = args.concurrency {
        config.crawl.concurrency = n;
    }
    config.validate()?;

    let store = DocumentStore::open(&config.storage.doc_dir, &config.storage.encoding)?;
    tracing::info!(
        existing = store.len(),
        target = config.crawl.target_count,
        concurrency = config.crawl.concurrency,
        doc_dir = %config.storage.doc_dir.display(),
        "crawler starting"
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("shutdown requested, draining in-flight fetches");
            let _ = stop_tx.send(true);
        }
    });

    let crawler = Crawler::new(HttpFetcher::new(&config.crawl)?, &config.crawl)?;
    let report = crawler.run(&store, stop_rx).await?;
    println!(
        "done: stored={} duplicates={} failed={} pages={}/{} total={}",
        report.stored,
        report.duplicates,
        report.failed,
        report.pages_visited,
        report.page_count,
        store.len()
    );
    Ok(())
}
