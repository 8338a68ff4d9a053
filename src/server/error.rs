//! Error types for the HTTP server.

use std::net::SocketAddr;

use thiserror::Error;

use crate::message::{Error as MessageError, HttpVersion};

/// Errors that can occur during HTTP server operation.
#[derive(Debug, Error)]
pub enum Error {
    /// The listening socket could not be bound. The server does not start.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The server was configured for a protocol version it cannot serve.
    #[error("Unsupported HTTP version: {0}")]
    UnsupportedVersion(HttpVersion),

    /// `launch` was called on a server that is already running.
    #[error("Server already launched")]
    AlreadyLaunched,

    /// Error parsing an HTTP request.
    #[error("Parse error: {0}")]
    ParseError(#[from] MessageError),

    /// I/O error on a single connection.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The configuration document could not be read.
    #[error("Invalid configuration: {0}")]
    Config(#[source] serde_json::Error),
}
