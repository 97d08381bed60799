//! Error taxonomy shared by every pipeline stage.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtlError {
    /// Timeout, refused connection, or a broken body stream.
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success status still present once retries are used up.
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: StatusCode },

    #[error("malformed response body")]
    Parse(#[from] serde_json::Error),

    #[error("failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode CSV into {}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("storage error")]
    Storage(#[from] sqlx::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EtlError {
    /// True for failures the fetcher may retry: connection problems and timeouts.
    pub fn is_transient_transport(&self) -> bool {
        match self {
            EtlError::Transport { source, .. } => source.is_connect() || source.is_timeout(),
            _ => false,
        }
    }
}
