//! Bridge configuration
//!
//! Configuration is resolved in three layers, weakest first:
//!
//! 1. Built-in defaults
//! 2. A TOML file, taken from the `BRIDGE_CONFIG` environment variable or
//!    `./bridge.toml` if present
//! 3. Environment variable overrides for the connection knobs
//!    (`INFLUX_HOST`, `INFLUX_PORT`, `INFLUX_DB`, `MARATHON_HOST`,
//!    `MARATHON_PORT`)

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ConfigError;

/// Top-level bridge configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Metrics store connection
    #[serde(default)]
    pub influx: InfluxConfig,

    /// Event source connection
    #[serde(default)]
    pub marathon: MarathonConfig,

    /// Delivery pipeline sizing
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Admin HTTP listen address (`/health`, `/metrics`)
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            influx: InfluxConfig::default(),
            marathon: MarathonConfig::default(),
            pipeline: PipelineConfig::default(),
            listen_addr: default_listen_addr(),
        }
    }
}

/// InfluxDB connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InfluxConfig {
    #[serde(default = "default_influx_host")]
    pub host: String,

    #[serde(default = "default_influx_port")]
    pub port: u16,

    #[serde(default = "default_influx_database")]
    pub database: String,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            host: default_influx_host(),
            port: default_influx_port(),
            database: default_influx_database(),
        }
    }
}

impl InfluxConfig {
    /// Write endpoint for the configured database, nanosecond precision
    pub fn write_url(&self) -> String {
        format!(
            "http://{}:{}/write?db={}&precision=ns",
            self.host, self.port, self.database
        )
    }
}

/// Marathon event-bus connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MarathonConfig {
    #[serde(default = "default_marathon_host")]
    pub host: String,

    #[serde(default = "default_marathon_port")]
    pub port: u16,
}

impl Default for MarathonConfig {
    fn default() -> Self {
        Self {
            host: default_marathon_host(),
            port: default_marathon_port(),
        }
    }
}

impl MarathonConfig {
    /// Event stream endpoint
    pub fn events_url(&self) -> String {
        format!("http://{}:{}/v2/events", self.host, self.port)
    }
}

/// Delivery pipeline sizing
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Capacity of the batch queue between intake and the write workers.
    /// A full queue drops the newest batch.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Number of concurrent write workers; this bounds in-flight sink writes.
    #[serde(default = "default_write_workers")]
    pub write_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            write_workers: default_write_workers(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_influx_host() -> String {
    "localhost".to_string()
}

fn default_influx_port() -> u16 {
    8086
}

fn default_influx_database() -> String {
    "marathon".to_string()
}

fn default_marathon_host() -> String {
    "localhost".to_string()
}

fn default_marathon_port() -> u16 {
    8080
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_write_workers() -> usize {
    4
}

impl BridgeConfig {
    /// Load configuration from file and environment
    pub fn load() -> Self {
        let mut config = Self::load_file();
        config.apply_env();
        config
    }

    /// Parse configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    fn load_file() -> Self {
        // Check environment variable first
        if let Ok(path) = std::env::var("BRIDGE_CONFIG") {
            match Self::from_file(&path) {
                Ok(config) => {
                    info!(path = %path, "Loaded configuration from file");
                    return config;
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Failed to load config file, using defaults");
                }
            }
        }

        // Check default config file
        if let Ok(config) = Self::from_file("bridge.toml") {
            info!("Loaded configuration from bridge.toml");
            return config;
        }

        info!("Using default configuration");
        Self::default()
    }

    /// Apply environment-variable overrides for the connection knobs
    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("INFLUX_HOST") {
            self.influx.host = host;
        }
        if let Ok(port) = std::env::var("INFLUX_PORT") {
            match port.parse() {
                Ok(port) => self.influx.port = port,
                Err(e) => warn!(value = %port, error = %e, "Ignoring invalid INFLUX_PORT"),
            }
        }
        if let Ok(database) = std::env::var("INFLUX_DB") {
            self.influx.database = database;
        }
        if let Ok(host) = std::env::var("MARATHON_HOST") {
            self.marathon.host = host;
        }
        if let Ok(port) = std::env::var("MARATHON_PORT") {
            match port.parse() {
                Ok(port) => self.marathon.port = port,
                Err(e) => warn!(value = %port, error = %e, "Ignoring invalid MARATHON_PORT"),
            }
        }
    }
}
