use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not supported: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("network request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to read image {path:?}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("generation could not be dispatched: {0}")]
    Dispatch(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("a generation run is already in progress")]
    Busy,

    #[error("not permitted: {0}")]
    NotPermitted(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("internal error: {0}")]
    Other(String),
}

impl AppError {
    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported(feature.into())
    }

    pub fn not_permitted(reason: impl Into<String>) -> Self {
        Self::NotPermitted(reason.into())
    }

    pub fn auth(reason: impl Into<String>) -> Self {
        Self::Auth(reason.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Short machine-readable tag carried on `app.error` events.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Unsupported(_) => "unsupported",
            AppError::Io(_) | AppError::Encode { .. } => "io",
            AppError::Reqwest(_) | AppError::Generation(_) => "generation",
            AppError::SerdeJson(_) => "json",
            AppError::Dispatch(_) => "dispatch",
            AppError::Busy => "busy",
            AppError::NotPermitted(_) => "not_permitted",
            AppError::Auth(_) => "auth",
            AppError::Other(_) => "internal",
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(value.to_string())
    }
}
