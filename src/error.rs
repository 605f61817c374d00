// src/error.rs

//! Error types shared by the audit core.

use thiserror::Error;

/// Main error type for audit operations.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed issue: {0}")]
    MalformedIssue(String),
}

/// Result type alias for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;
