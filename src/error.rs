//! Error types for the bridge

use thiserror::Error;

/// Main error type for the bridge
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Metrics sink error
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Event source error
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Metrics sink errors
#[derive(Error, Debug)]
pub enum SinkError {
    /// Transport-level failure reaching the store
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store accepted the connection but rejected the write
    #[error("Write rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Event source errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// The subscription request could not be established
    #[error("Connection error: {0}")]
    Connect(#[from] reqwest::Error),

    /// The source refused the subscription
    #[error("Subscription rejected with status {status}")]
    Rejected { status: u16 },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
