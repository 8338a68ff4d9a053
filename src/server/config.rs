//! Server configuration.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::message::HttpVersion;
use crate::server::error::Error;

/// HTTP server configuration.
///
/// Every field has a default, so a JSON document only needs to name the
/// settings it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The address to bind to. The port is given to `launch`.
    pub host: IpAddr,
    /// Protocol version served. HTTP/1.1 keeps connections open, HTTP/1.0
    /// answers one request per connection.
    pub version: HttpVersion,
    /// The read buffer size.
    pub read_buffer_size: usize,
    /// Seconds a connection may stay silent before it is reaped.
    pub idle_timeout_secs: u64,
    /// Requests served on one persistent connection before it is closed.
    pub request_budget: usize,
    /// Milliseconds between two scans of the connection registry.
    pub reap_interval_ms: u64,
    /// Milliseconds the acceptor waits for a connection before re-checking
    /// the shutdown signal.
    pub accept_poll_ms: u64,
    /// Value of the `Server` header stamped on every response.
    pub server_name: String,
}

impl ServerConfig {
    /// Load a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(Error::Config)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_millis(self.reap_interval_ms)
    }

    pub fn accept_poll_interval(&self) -> Duration {
        Duration::from_millis(self.accept_poll_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            version: HttpVersion::Http11,
            read_buffer_size: 1024,
            idle_timeout_secs: 100,
            request_budget: 125,
            reap_interval_ms: 10,
            accept_poll_ms: 10,
            server_name: "microhttpd-rs".to_string(),
        }
    }
}
