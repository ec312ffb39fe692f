use anyhow::Result;
use clap::{Parser, Subcommand};
use newsdex_core::Config;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the inverted index over the document store", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "./newsdex.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index from every stored document
    Build {
        /// Override `[index] workers` (0 = one per CPU)
        #[arg(long)]
        workers: Option<usize>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Build { workers } => {
            if let Some(workers) = workers {
                config.index.workers = workers;
            }
            let stats = newsdex_indexer::build_index(&config)?;
            println!("indexed {} documents, {} terms ({} skipped)", stats.num_docs, stats.num_terms, stats.skipped_docs);
            Ok(())
        }
    }
}
