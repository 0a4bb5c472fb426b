//! # vista-agent
//!
//! Vista server binary. Wires settings, credentials, and the trigger policy
//! into a [`VistaServer`] and serves until Ctrl-C.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use vista_auth::{AuthError, CachedCredentials, CredentialProvider, TokenSource as _};
use vista_core::logging::LogFormat;
use vista_live::LiveConfig;
use vista_server::{LiveBridgeFactory, ServerConfig, VistaServer};
use vista_session::TriggerPolicy;
use vista_settings::VistaSettings;

/// Time open sessions get to send their summaries after Ctrl-C.
const SESSION_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Vista live-session server.
#[derive(Parser, Debug)]
#[command(name = "vista-agent", about = "Vista live-session server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (defaults to `~/.vista/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log filter directive (overrides settings).
    #[arg(long)]
    log_level: Option<String>,
}

/// Load settings and fold CLI overrides into them.
fn resolve_settings(cli: &Cli) -> Result<VistaSettings> {
    let mut settings = match &cli.settings {
        Some(path) => vista_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => vista_settings::load_settings().context("Failed to load settings")?,
    };
    if let Some(host) = &cli.host {
        settings.server.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    if let Some(level) = &cli.log_level {
        settings.logging.level.clone_from(level);
    }
    Ok(settings)
}

fn load_policy(settings: &VistaSettings) -> Result<Arc<TriggerPolicy>> {
    match settings.safety_policy_path.as_deref().filter(|p| !p.is_empty()) {
        Some(path) => {
            let policy = TriggerPolicy::from_json_file(Path::new(path))
                .with_context(|| format!("Failed to load safety policy from {path}"))?;
            tracing::info!(path, "safety policy loaded");
            Ok(Arc::new(policy))
        }
        None => Ok(TriggerPolicy::shared_default()),
    }
}

/// Stands in when no credential source is discoverable at startup, so
/// each connect attempt reports the discovery failure to its client.
struct Unconfigured(String);

#[async_trait]
impl CredentialProvider for Unconfigured {
    async fn access_token(&self) -> vista_auth::Result<String> {
        Err(AuthError::NotConfigured(self.0.clone()))
    }
}

fn credentials() -> Arc<dyn CredentialProvider> {
    match vista_auth::discover_token_source() {
        Ok(source) => {
            tracing::info!(source = source.kind(), "credential source discovered");
            Arc::new(CachedCredentials::new(source))
        }
        Err(e) => {
            tracing::warn!(error = %e, "no credentials found; live sessions will fail to connect");
            Arc::new(Unconfigured(e.to_string()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;

    vista_core::logging::init_subscriber(
        &settings.logging.level,
        LogFormat::from_json_flag(settings.logging.json),
    );

    let policy = load_policy(&settings)?;
    let live = LiveConfig::from_settings(&settings);
    if live.project().is_none() {
        tracing::warn!("no project id configured; direct live sessions will fail to connect");
    }
    let factory = LiveBridgeFactory::new(live, credentials());

    let server = VistaServer::new(ServerConfig::from_settings(&settings.server), Arc::new(factory))
        .with_policy(policy);

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("Vista agent listening on http://{addr} (live sessions at ws://{addr}/ws/live)");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server.shutdown().shutdown();
    let _ = server.shutdown().drain(SESSION_DRAIN_TIMEOUT).await;
    let _ = handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
