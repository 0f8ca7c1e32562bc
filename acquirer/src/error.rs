//! Error types for the acquirer adapter

use thiserror::Error;

/// Result type for acquirer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Acquirer adapter errors.
///
/// Acquirer error bodies are preserved verbatim for support diagnostics;
/// card data never appears in them because it never enters a message.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid client construction input
    #[error("Acquirer configuration error: {0}")]
    Config(String),

    /// OAuth token exchange failed
    #[error("Acquirer authentication failed ({status}): {message}")]
    Authentication {
        /// HTTP status code
        status: u16,
        /// Acquirer error body
        message: String,
    },

    /// Card tokenization failed
    #[error("Card tokenization failed ({status}): {message}")]
    Tokenization {
        /// HTTP status code
        status: u16,
        /// Acquirer error body
        message: String,
    },

    /// Payment submission or query failed
    #[error("Acquirer payment error ({status}): {body}")]
    Payment {
        /// HTTP status code
        status: u16,
        /// Raw acquirer error body
        body: String,
    },

    /// Response did not match the expected shape
    #[error("Malformed acquirer response: {0}")]
    MalformedResponse(String),

    /// HTTP client error (connect, timeout, TLS)
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
