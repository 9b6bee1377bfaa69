//! Landlord server entry point.
//!
//! Loads configuration, installs logging and runs the server until a
//! termination signal arrives.

mod cli;
mod config;
mod logging;
mod signals;

use anyhow::{anyhow, Result};
use cli::CliArgs;
use config::AppConfig;
use landlord_server::GameServer;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{error, info};

/// The configured server, ready to run.
pub struct Application {
    config: AppConfig,
    server: Arc<GameServer>,
}

impl Application {
    pub async fn new(args: CliArgs) -> Result<Self> {
        // Configuration is loaded before logging so its level applies
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        config.apply_cli(&args);
        config
            .validate()
            .map_err(|e| anyhow!("Configuration validation failed: {e}"))?;

        logging::setup_logging(&config.logging)?;
        info!(
            "🃏 Landlord server v{} | config: {}",
            env!("CARGO_PKG_VERSION"),
            args.config_path.display()
        );

        let server = GameServer::new(config.to_server_config()?);
        Ok(Self {
            config,
            server: Arc::new(server),
        })
    }

    pub async fn run(self) -> Result<()> {
        info!("📋 Configuration Summary:");
        info!("  🌐 Listening on: {}", self.config.socket_address()?);
        info!("  👥 Max connections: {}", self.config.server.max_connections);
        info!("  🎲 Initial K: {}", self.config.table.initial_k);
        match &self.config.ratings.path {
            Some(path) => info!("  📒 Ratings: {}", path.display()),
            None => info!("  📒 Ratings: in memory"),
        }

        let mut server_handle = {
            let server = self.server.clone();
            tokio::spawn(async move { server.start().await })
        };

        info!("🛑 Press Ctrl+C to shut down");
        tokio::select! {
            finished = &mut server_handle => {
                return match finished {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e.into()),
                    Err(e) => Err(e.into()),
                };
            }
            signal = signals::wait_for_shutdown_signal() => signal?,
        }

        info!("🛑 Shutdown signal received, initiating graceful shutdown...");
        self.server.shutdown().await?;
        if timeout(Duration::from_secs(3), server_handle).await.is_err() {
            error!("Server did not stop within 3 seconds");
        }

        info!("✅ Landlord server shutdown complete");
        Ok(())
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let args = CliArgs::parse();

    let app = match Application::new(args).await {
        Ok(app) => app,
        Err(e) => {
            eprintln!("❌ Failed to start application: {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = app.run().await {
        error!("❌ Application error: {e:#}");
        std::process::exit(1);
    }
}
