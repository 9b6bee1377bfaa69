//! Configuration management for the Landlord server binary.
//!
//! Settings come from a TOML file, which is created with defaults when
//! missing, and are then overridden by command-line arguments.

use crate::cli::CliArgs;
use anyhow::{anyhow, Result};
use landlord_server::messaging::codec::DEFAULT_MAX_FRAME_LEN;
use landlord_server::ServerConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use tracing::info;

/// Rating multipliers a table may start with.
pub const VALID_INITIAL_K: [u32; 2] = [32, 64];

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub table: TableSettings,
    #[serde(default)]
    pub ratings: RatingSettings,
    pub logging: LoggingSettings,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// IP address to listen on (e.g., "127.0.0.1")
    pub bind_address: String,
    pub port: u16,
    /// Maximum number of concurrent client connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Pending events the table accepts before connections wait
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
    /// Largest accepted frame body in bytes
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
}

fn default_max_connections() -> usize {
    64
}

fn default_event_queue_capacity() -> usize {
    256
}

fn default_max_frame_len() -> usize {
    DEFAULT_MAX_FRAME_LEN
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSettings {
    /// Rating multiplier at the start of every game, 32 or 64
    pub initial_k: u32,
    /// Fixed shuffle seed for reproducible deals
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            initial_k: 64,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingSettings {
    /// Rating file; ratings are not persisted when absent
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            path: Some(PathBuf::from("ratings.json")),
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_address: "127.0.0.1".to_string(),
                port: 2333,
                max_connections: default_max_connections(),
                event_queue_capacity: default_event_queue_capacity(),
                max_frame_len: default_max_frame_len(),
            },
            table: TableSettings::default(),
            ratings: RatingSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at
    /// the specified path and returns the default configuration.
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Overrides file settings with whatever was given on the command line.
    pub fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(address) = &args.bind_address {
            self.server.bind_address = address.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(path) = &args.rating_db {
            self.ratings.path = Some(path.clone());
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
    }

    pub fn socket_address(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .server
            .bind_address
            .parse()
            .map_err(|_| anyhow!("Invalid bind address: {}", self.server.bind_address))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// Converts into the library's server configuration.
    pub fn to_server_config(&self) -> Result<ServerConfig> {
        Ok(ServerConfig {
            bind_address: self.socket_address()?,
            max_connections: self.server.max_connections,
            event_queue_capacity: self.server.event_queue_capacity,
            max_frame_len: self.server.max_frame_len,
            initial_k: self.table.initial_k,
            seed: self.table.seed,
            rating_store: self.ratings.path.clone(),
        })
    }

    /// Validates the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<IpAddr>().is_err() {
            return Err(format!("Invalid bind address: {}", &self.server.bind_address));
        }
        if self.server.max_connections == 0 {
            return Err("max_connections must be at least 1".to_string());
        }
        if self.server.event_queue_capacity == 0 {
            return Err("event_queue_capacity must be at least 1".to_string());
        }
        if self.server.max_frame_len == 0 {
            return Err("max_frame_len must be at least 1".to_string());
        }

        if !VALID_INITIAL_K.contains(&self.table.initial_k) {
            return Err(format!(
                "Invalid initial_k: {}. Must be one of: {VALID_INITIAL_K:?}",
                self.table.initial_k
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}
