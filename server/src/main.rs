use anyhow::Result;
use clap::Parser;
use newsdex_core::persist::IndexPaths;
use newsdex_core::Config;
use newsdex_server::{build_app, spawn_reloader, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Serve search and related-article lookups over HTTP")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "./newsdex.toml")]
    config: PathBuf,
    /// Override `[server] host`
    #[arg(long)]
    host: Option<String>,
    /// Override `[server] port`
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let mut config = Config::load(&args.config)?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    let state = AppState::from_config(&config)?;
    {
        let snapshot = state.index.current();
        tracing::info!(
            docs = snapshot.engine.index().num_docs(),
            terms = snapshot.engine.index().num_terms(),
            neighbor_records = snapshot.neighbors.len(),
            "index loaded"
        );
    }
    if config.server.reload_interval_secs > 0 {
        spawn_reloader(
            state.index.clone(),
            IndexPaths::new(&config.storage.index_dir),
            config.ranking.idf,
            Duration::from_secs(config.server.reload_interval_secs),
        );
    }

    let app = build_app(state, &config.server.cors_allow_origins);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
