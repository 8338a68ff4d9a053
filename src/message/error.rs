//! Error types for HTTP messages and their parsing.

use thiserror::Error;

/// Errors that can occur while building or extracting an HTTP message.
#[derive(Debug, Error)]
pub enum Error {
    /// No bytes have been received yet.
    #[error("Empty message")]
    EmptyMessage,

    /// The header section or the body is still being received.
    #[error("Incomplete message")]
    Incomplete,

    /// The HTTP method in the request line is not supported.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The HTTP version in the start line is not supported.
    #[error("Invalid HTTP version: {0}")]
    InvalidVersion(String),

    /// The status code in a status line is missing or unknown.
    #[error("Invalid HTTP status: {0}")]
    InvalidStatus(String),

    /// The start line does not have the expected shape.
    #[error("Malformed start line: {0}")]
    MalformedStartLine(String),

    /// A required header is missing from the message.
    #[error("Required header is missing: {0}")]
    MissingHeader(String),

    /// Error parsing JSON.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}
