use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the bootstrapper.
/// Every module returns `Result<T, BootstrapError>`.
#[derive(Debug, Error)]
pub enum BootstrapError {
    // ── Input ───────────────────────────────────────────
    #[error("Edition must not be empty")]
    InvalidEdition,

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{edition} is not available to download from {url} (HTTP {status}), try a different version")]
    DownloadUnavailable {
        edition: String,
        url: String,
        status: u16,
    },

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Failed writing download to {path:?}: {source}")]
    DownloadWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Archive ─────────────────────────────────────────
    #[error("Extraction of {archive:?} failed: {reason}")]
    Extraction { archive: PathBuf, reason: String },

    #[error("Service registration failed: {0}")]
    ServiceRegistration(String),

    // ── Config ──────────────────────────────────────────
    #[error("Config file {path:?} could not be read or written: {source}")]
    Config {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type BootstrapResult<T> = Result<T, BootstrapError>;

impl From<std::io::Error> for BootstrapError {
    fn from(source: std::io::Error) -> Self {
        BootstrapError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl From<tokio::task::JoinError> for BootstrapError {
    fn from(err: tokio::task::JoinError) -> Self {
        BootstrapError::Other(format!("Task join error: {err}"))
    }
}
