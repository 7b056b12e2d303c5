//! Error taxonomy shared by the collector, client, stores and backtest engine

use thiserror::Error;

/// Errors raised by this crate
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Transport failure or timeout
    #[error("network error: {0}")]
    Network(String),

    /// Upstream API reported a structured failure
    #[error("API error {code}: {message}")]
    Server { code: i64, message: String },

    /// Response body did not match the expected shape
    #[error("invalid API response: {0}")]
    Decoding(String),

    /// Not enough candles to run a backtest
    #[error("insufficient data: {available} candles available, {required} required")]
    InsufficientData { required: usize, available: usize },

    /// Persistence failure
    #[error("store error: {0}")]
    Store(String),

    /// Strategy parameters failed validation
    #[error("invalid strategy: {0}")]
    InvalidStrategy(String),

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the collector may retry the batch that produced this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Server { .. } | Self::Decoding(_) | Self::Store(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decoding(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decoding(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
