//! Error types for the rebalancer.

use std::path::PathBuf;

use weightbook_broker::BrokerError;

/// All errors that can occur during rebalancer operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("target file error: {0}")]
    Target(String),

    #[error("failed to read target file {path}: {source}")]
    TargetRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse target JSON: {0}")]
    TargetParse(#[from] serde_json::Error),

    #[error("failed to read market file {path}: {source}")]
    MarketRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse market file {path}: {source}")]
    MarketParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("execution aborted: {0}")]
    Aborted(String),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
