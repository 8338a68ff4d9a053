//! Per-connection read, dispatch and write cycle.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time;

use crate::message::{ContentType, HttpMessage, HttpVersion, Request, Response, StatusCode};
use crate::parser::RequestParser;
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::registry::{ConnectionId, ConnectionRegistry};
use crate::server::router::Router;
use crate::server::signal::ShutdownSignal;

/// State shared by every connection of one server.
pub struct ConnectionContext {
    pub config: ServerConfig,
    pub router: Arc<Router>,
    pub registry: Arc<ConnectionRegistry>,
    pub shutdown: Arc<ShutdownSignal>,
}

/// Where a connection is in its request cycle.
#[derive(Debug)]
pub enum ConnectionState {
    Reading,
    Dispatching(Request),
    Writing(Response, bool), // bool = keep the connection open afterwards
    Closed,
}

/// One accepted transport together with its registry entry.
///
/// In persistent mode the connection keeps cycling through reading,
/// dispatching and writing until the client leaves, the registry stops
/// considering it alive or the server shuts down. In non-persistent mode it
/// serves exactly one request.
///
/// Eviction by the registry aborts whatever step is running. Server shutdown
/// only closes a connection waiting for its next request; a request already
/// partly received is completed and answered first, provided each step makes
/// progress within the idle timeout.
pub struct Connection<S> {
    id: ConnectionId,
    stream: S,
    closer: Arc<ShutdownSignal>,
    context: Arc<ConnectionContext>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a transport registered under `id`; `closer` is the signal the
    /// registry returned for it.
    pub fn new(
        id: ConnectionId,
        stream: S,
        closer: Arc<ShutdownSignal>,
        context: Arc<ConnectionContext>,
    ) -> Self {
        Self {
            id,
            stream,
            closer,
            context,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Give back the transport.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Serve requests until the connection closes, then drop the registry
    /// record and shut the transport down.
    pub async fn run(&mut self) {
        let mut state = ConnectionState::Reading;

        loop {
            state = match state {
                ConnectionState::Reading => match self.read_request().await {
                    Ok(Some(request)) => ConnectionState::Dispatching(request),
                    Ok(None) => ConnectionState::Closed,
                    Err(Error::ParseError(e)) => {
                        debug!("Connection {id}: bad request: {e}", id = self.id);
                        let response = Response::new(self.context.config.version, StatusCode::BadRequest)
                            .with_content_type(ContentType::Text)
                            .with_body_string(format!("Error parsing request: {e}"));
                        self.write_close(response)
                    }
                    Err(e) => {
                        error!("Connection {id}: read failed: {e}", id = self.id);
                        ConnectionState::Closed
                    }
                },

                ConnectionState::Dispatching(request) => {
                    let mut response = self.dispatch(&request);
                    let keep_alive = self.finish_response(&request, &mut response);
                    ConnectionState::Writing(response, keep_alive)
                }

                ConnectionState::Writing(response, keep_alive) => {
                    match self.write_response(&response).await {
                        Ok(true) if keep_alive && self.is_alive() => ConnectionState::Reading,
                        Ok(_) => ConnectionState::Closed,
                        Err(e) => {
                            error!("Connection {id}: write failed: {e}", id = self.id);
                            ConnectionState::Closed
                        }
                    }
                }

                ConnectionState::Closed => break,
            };
        }

        self.context.registry.remove(self.id);
        if let Err(e) = self.stream.shutdown().await {
            debug!("Connection {id}: shutdown failed: {e}", id = self.id);
        }
        debug!("Connection {id} closed", id = self.id);
    }

    /// Receive chunks until a request is complete. `Ok(None)` means the peer
    /// went away, the registry asked for the transport to close or the server
    /// is shutting down.
    async fn read_request(&mut self) -> Result<Option<Request>, Error> {
        let mut parser = RequestParser::new();
        let mut buf = vec![0; self.context.config.read_buffer_size.max(1)];
        let idle_timeout = self.context.config.idle_timeout();

        loop {
            let waiting = parser.is_empty();
            let n = tokio::select! {
                read = self.stream.read(&mut buf) => read?,
                _ = self.closer.triggered() => {
                    debug!("Connection {id}: closed by registry", id = self.id);
                    return Ok(None);
                }
                _ = self.context.shutdown.triggered(), if waiting => {
                    debug!("Connection {id}: closed by server shutdown", id = self.id);
                    return Ok(None);
                }
                _ = shutdown_deadline(&self.context.shutdown, idle_timeout), if !waiting => {
                    warn!("Connection {id}: partial request abandoned after shutdown", id = self.id);
                    return Ok(None);
                }
            };

            if n == 0 {
                return Ok(None);
            }
            if parser.append_data(&buf[..n]) {
                return Ok(Some(parser.message()?));
            }
        }
    }

    /// Find the handler for the request and let it answer.
    fn dispatch(&self, request: &Request) -> Response {
        let response = match self.context.router.dispatch(&request.uri) {
            Some(handler) => handler.handle_request(request),
            None => Response::new(self.context.config.version, StatusCode::NotFound)
                .with_content_type(ContentType::Text)
                .with_body_string(format!("Not found: {uri}", uri = request.uri)),
        };

        debug!(
            "Connection {id}: {method} {uri} -> {status}",
            id = self.id,
            method = request.method,
            uri = request.uri,
            status = response.status.as_u16()
        );
        response
    }

    /// Stamp the response, spend one unit of budget and decide whether the
    /// connection stays open.
    fn finish_response(&self, request: &Request, response: &mut Response) -> bool {
        let config = &self.context.config;
        response.set_header("Server", &config.server_name);

        let remaining = self.context.registry.record_request(self.id).unwrap_or(0);
        let keep_alive = config.version.is_persistent()
            && request.version == HttpVersion::Http11
            && response.version == HttpVersion::Http11
            && remaining > 0
            && !self.context.shutdown.is_triggered();

        if keep_alive {
            response.set_header("Connection", "keep-alive");
            response.set_header(
                "Keep-Alive",
                &format!("timeout={}, max={remaining}", config.idle_timeout_secs),
            );
        } else {
            response.set_header("Connection", "close");
        }
        keep_alive
    }

    fn write_close(&self, mut response: Response) -> ConnectionState {
        response.set_header("Server", &self.context.config.server_name);
        response.set_header("Connection", "close");
        ConnectionState::Writing(response, false)
    }

    /// Send the response. Returns `Ok(false)` if the write was abandoned
    /// because the registry closed the connection or the peer stopped
    /// reading past the shutdown deadline.
    async fn write_response(&mut self, response: &Response) -> Result<bool, Error> {
        let bytes = response.to_bytes();
        let idle_timeout = self.context.config.idle_timeout();

        tokio::select! {
            written = write_all(&mut self.stream, &bytes) => {
                written?;
                Ok(true)
            }
            _ = self.closer.triggered() => {
                debug!("Connection {id}: write aborted by registry", id = self.id);
                Ok(false)
            }
            _ = shutdown_deadline(&self.context.shutdown, idle_timeout) => {
                warn!("Connection {id}: write abandoned after shutdown", id = self.id);
                Ok(false)
            }
        }
    }

    fn is_alive(&self) -> bool {
        !self.context.shutdown.is_triggered() && self.context.registry.is_alive(self.id)
    }
}

async fn write_all<S: AsyncWrite + Unpin>(stream: &mut S, bytes: &[u8]) -> io::Result<()> {
    stream.write_all(bytes).await?;
    stream.flush().await
}

/// Resolves one idle timeout after the server started shutting down.
async fn shutdown_deadline(shutdown: &ShutdownSignal, idle_timeout: Duration) {
    shutdown.triggered().await;
    time::sleep(idle_timeout).await;
}
