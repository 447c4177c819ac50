//! Crate-wide error type.

use thiserror::Error;

use crate::parser::ParseError;

/// Failures of a scrape phase or of region resolution.
#[derive(Debug, Error)]
pub enum Error {
    /// The request produced no HTTP response: credentials could not be
    /// resolved, the connection failed or timed out.
    #[error("request failed: {0}")]
    Transport(String),
    /// The function answered with a non-success status or a function error.
    #[error("lambda invoke error (status {status}): {diagnostic}")]
    Invoke {
        /// HTTP status of the invocation.
        status: u16,
        /// Function error kind or response body, whichever is available.
        diagnostic: String,
    },
    /// A JSON document could not be decoded.
    #[error("couldn't decode json payload: {0}")]
    Decode(#[from] serde_json::Error),
    /// The embedded exposition text is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The instance metadata service reported an error.
    #[error("instance metadata error: {0}")]
    Metadata(String),
    /// A configured endpoint does not form a valid URL.
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
}

/// Result alias using the crate [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;
