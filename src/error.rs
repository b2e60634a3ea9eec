// src/error.rs

//! Error types for license resolution
//!
//! Strategy failures are almost never fatal: the pipeline logs them and
//! moves on. `Canceled` is the exception and always propagates.

use thiserror::Error;

/// Errors that can occur while resolving license text
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON we expected
    #[error("Malformed JSON response: {0}")]
    Json(#[from] serde_json::Error),

    /// Local filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// License content could not be decoded
    #[error("Failed to decode license content: {0}")]
    Decode(String),

    /// Package manifest could not be parsed
    #[error("Failed to parse manifest '{path}': {reason}")]
    Manifest { path: String, reason: String },

    /// Invalid file name pattern
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Configuration is unreadable or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// A coalesced waiter observed the leader's failure
    #[error("Coalesced resolution failed: {0}")]
    Coalesced(String),

    /// The run was canceled
    #[error("Operation canceled")]
    Canceled,
}

impl Error {
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled)
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Decode(e.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Error::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
