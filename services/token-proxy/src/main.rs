//! eve-token-proxy: OAuth2 token exchange proxy for EVE Online SSO.
//!
//! Exchanges authorization codes for access tokens on behalf of a browser
//! frontend, keeping the client secret server-side, and persists issued
//! tokens in SQLite so they can be refreshed later.

mod config;
mod error;
mod metrics;
mod routes;
mod store;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::Config;
use crate::routes::{AppState, build_router};
use crate::store::TokenStore;
use eve_sso::SsoClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let cli_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str);
    let config_path = Config::resolve_path(cli_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let prometheus = metrics::install_recorder();

    let store = TokenStore::connect(&config.database.url)
        .await
        .context("opening token store")?;

    let secret = config
        .sso
        .secret
        .as_ref()
        .context("SSO client secret not resolved")?;
    let sso = SsoClient::new(
        reqwest::Client::new(),
        &config.sso.client_id,
        secret.expose(),
        &config.sso.user_agent,
    );

    let state = AppState {
        sso,
        store,
        client_id: config.sso.client_id.clone(),
        prometheus,
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.server.listen_addr))?;
    info!(addr = %config.server.listen_addr, "eve-token-proxy listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json())
        .init();
}

/// Resolve on Ctrl-C or SIGTERM so container runtimes can stop the service
/// cleanly.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => tracing::error!(%err, "failed to install sigterm handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received sigterm"),
    }
}
