use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rackhouse::app::{Application, Manifest};
use rackhouse::config::{Cli, Config};
use rackhouse::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::from(Cli::parse());

    let router = Manifest::load(&cfg.app_file)
        .and_then(Manifest::into_router)
        .with_context(|| format!("cannot build application from {}", cfg.app_file.display()))?;
    let app: Arc<dyn Application> = Arc::new(router);

    tokio::select! {
        res = server::run(&cfg, app) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
