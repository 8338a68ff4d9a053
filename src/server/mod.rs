//! HTTP server implementation for microhttpd-rs.
//!
//! An acceptor task hands every connection to its own task, which cycles
//! through reading, dispatching and writing. A reaper task evicts connections
//! that stayed silent for longer than the idle timeout.

mod config;
mod connection;
mod error;
mod handler;
mod http_server;
mod registry;
mod router;
mod signal;
mod tests;

// Re-export public items
pub use config::ServerConfig;
pub use connection::{Connection, ConnectionContext, ConnectionState};
pub use error::Error;
pub use handler::RequestHandler;
pub use http_server::HttpServer;
pub use registry::{
    run_reaper, Clock, ConnectionId, ConnectionRecord, ConnectionRegistry, SystemClock,
};
pub use router::{Route, Router};
pub use signal::ShutdownSignal;
