use anyhow::Result;
use clap::Parser;
use newsdex_core::Config;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "recommender")]
#[command(about = "Precompute related articles for every indexed document", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "./newsdex.toml")]
    config: PathBuf,
    /// Override `[recommend] k`
    #[arg(long)]
    k: Option<usize>,
    /// Override `[recommend] candidate_pool`
    #[arg(long)]
    candidate_pool: Option<usize>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    if let Some(k) = cli.k {
        config.recommend.k = k;
    }
    if let Some(pool) = cli.candidate_pool {
        config.recommend.candidate_pool = pool;
    }
    config.validate()?;

    let table = newsdex_recommender::recommend(&config)?;
    println!("computed neighbors for {} documents (k = {})", table.len(), table.k());
    Ok(())
}
