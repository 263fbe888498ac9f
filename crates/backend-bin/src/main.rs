// ============================
// smartfarm-backend-bin/src/main.rs
// ============================
//! Tokio / Axum entry-point for the SmartFarm account server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use smartfarm_backend::{
    config::{Settings, DEFAULT_CONFIG_FILE},
    router, telemetry, AppState,
};

/// How often expired reset-token redemptions and verification codes are dropped
const PRUNE_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Parser, Debug)]
#[command(name = "smartfarm-server", version, about = "SmartFarm account server")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override `server.bind_addr`
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_from(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    if let Some(bind) = cli.bind {
        settings.server.bind_addr = bind;
    }

    telemetry::init_tracing(&settings.log)?;

    let addr = settings.server.bind_addr;
    let state = Arc::new(AppState::new(settings)?);

    let pruner = state.auth.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            ticker.tick().await;
            let dropped = pruner.prune_expired();
            if dropped > 0 {
                tracing::debug!(dropped, "pruned expired auth state");
            }
        }
    });

    let app = router::create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
