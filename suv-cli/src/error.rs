//! Error types for the CLI

use thiserror::Error;

/// Main CLI error type
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session file error
    #[error("Session file error: {0}")]
    SessionFile(#[from] SessionFileError),

    /// Portal client error
    #[error("{0}")]
    Portal(#[from] suv_http_client::SuvError),

    /// Restoring a saved token failed
    #[error("Authentication error: {0}")]
    Auth(#[from] suv_http_client::AuthError),

    /// JSON output failed
    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Session file errors
#[derive(Error, Debug)]
pub enum SessionFileError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Session directory creation failed
    #[error("Session directory creation failed: {0}")]
    DirCreation(String),
}
