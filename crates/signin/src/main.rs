mod app;
mod config;
mod handlers;
mod state;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use listenfd::ListenFd;
use signin_auth::{mock_idp::MockIdpServer, spawn_attempt_sweeper, AuthConfig, AuthState, OidcConfig};
use tokio::{net::TcpListener, signal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use crate::{app::create_app, config::Config, state::AppState};

/// Signin - sign in with a custom OIDC provider, Discord or GitHub
#[derive(Parser, Debug)]
#[command(name = "signin")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Host address to bind the server to
    #[arg(long, short = 'H', default_value = "0.0.0.0", env = "HOST")]
    host: String,

    /// Port to listen on
    #[arg(long, short, default_value = "3000", env = "PORT")]
    port: u16,

    /// Run the bundled mock OIDC provider on this port (development only).
    ///
    /// Used as the custom OIDC provider unless OIDC_CLIENT_ID is set.
    #[arg(long, env = "MOCK_IDP_PORT")]
    mock_idp_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signin=debug,signin_auth=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let mut auth_config = AuthConfig::from_env()?;

    if let Some(port) = cli.mock_idp_port {
        start_mock_idp(port, &config, &mut auth_config)?;
    }

    if !auth_config.has_providers() {
        tracing::warn!("No identity provider configured; sign-in is unavailable");
    }

    let (sessions, users) = state::build_stores(&config).await?;
    let sweeper = spawn_attempt_sweeper(
        sessions.clone(),
        auth_config.attempt_ttl,
        Duration::from_secs(config.attempt_sweep_seconds),
    );

    let auth = AuthState::new(sessions, users, auth_config)?;
    for provider in auth.providers() {
        tracing::info!(provider = %provider.kind(), name = provider.display_name(), "Provider enabled");
    }

    // Build the application router
    let app = create_app(AppState::new(auth));

    // Auto-reload support via listenfd
    let mut listenfd = ListenFd::from_env();
    let listener = match listenfd.take_tcp_listener(0)? {
        // If we are given a tcp listener on listen fd 0, use that one
        Some(listener) => {
            listener.set_nonblocking(true)?;
            TcpListener::from_std(listener)?
        }
        // Otherwise fall back to CLI-specified host:port
        None => {
            let addr = format!("{}:{}", cli.host, cli.port);
            TcpListener::bind(&addr).await?
        }
    };

    tracing::info!("listening on {}", listener.local_addr()?);

    // Run the server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("Server stopped");
    Ok(())
}

/// Spawn the mock IdP and point the custom OIDC provider at it.
fn start_mock_idp(port: u16, config: &Config, auth_config: &mut AuthConfig) -> Result<()> {
    if auth_config.oidc.is_some() {
        tracing::warn!("OIDC_CLIENT_ID is set; the mock IdP runs but is not used for sign-in");
    } else {
        let mock_idp_url = Url::parse(&format!("http://localhost:{port}"))?;
        auth_config.oidc = Some(OidcConfig::for_mock_idp(
            &auth_config.base_url,
            &mock_idp_url,
            &config.mock_idp_client_id,
        )?);
    }

    let server = MockIdpServer::new(port, config.mock_idp_client_id.clone());
    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!("Mock IdP server failed: {}", e);
        }
    });

    Ok(())
}

/// Wait for shutdown signals (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}
