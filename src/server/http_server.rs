//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time;

use crate::message::HttpVersion;
use crate::server::config::ServerConfig;
use crate::server::connection::{Connection, ConnectionContext};
use crate::server::error::Error;
use crate::server::handler::RequestHandler;
use crate::server::registry::{run_reaper, Clock, ConnectionRegistry};
use crate::server::router::Router;
use crate::server::signal::ShutdownSignal;

/// Background tasks of a launched server.
struct Running {
    context: Arc<ConnectionContext>,
    acceptor: JoinHandle<()>,
    reaper: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// An HTTP server.
///
/// Routes are registered before [`launch`](HttpServer::launch); once the server
/// runs the route table is shared read-only with every connection.
pub struct HttpServer {
    config: ServerConfig,
    router: Arc<Router>,
    registry: Arc<ConnectionRegistry>,
    running: Option<Running>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails if the configured protocol version cannot be served.
    pub fn new(config: ServerConfig) -> Result<Self, Error> {
        let registry = ConnectionRegistry::new(config.idle_timeout(), config.request_budget);
        Self::with_registry(config, registry)
    }

    /// Like [`HttpServer::new`], with connection activity timed by `clock`.
    pub fn with_clock(config: ServerConfig, clock: Arc<dyn Clock>) -> Result<Self, Error> {
        let registry =
            ConnectionRegistry::with_clock(clock, config.idle_timeout(), config.request_budget);
        Self::with_registry(config, registry)
    }

    fn with_registry(config: ServerConfig, registry: ConnectionRegistry) -> Result<Self, Error> {
        if !matches!(config.version, HttpVersion::Http10 | HttpVersion::Http11) {
            return Err(Error::UnsupportedVersion(config.version));
        }

        Ok(Self {
            config,
            router: Arc::new(Router::new()),
            registry: Arc::new(registry),
            running: None,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The live connection table.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Address the server listens on, once launched.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    /// Register `handler` for every URI starting with `path`.
    ///
    /// Returns `false` if the path is malformed or taken, or if the server has
    /// already been launched.
    pub fn register<H: RequestHandler>(&mut self, path: impl Into<String>, handler: H) -> bool {
        match Arc::get_mut(&mut self.router) {
            Some(router) => router.register(path, handler),
            None => {
                warn!("Routes cannot be added to a launched server");
                false
            }
        }
    }

    /// Bind `host:port` and start accepting connections. Port 0 picks a free
    /// port; the bound address is returned.
    pub async fn launch(&mut self, port: u16) -> Result<SocketAddr, Error> {
        if self.running.is_some() {
            return Err(Error::AlreadyLaunched);
        }

        let listener = self.setup_listener(port).await?;
        let local_addr = listener.local_addr()?;
        self.display_server_info(local_addr);

        let shutdown = Arc::new(ShutdownSignal::new());
        let context = Arc::new(ConnectionContext {
            config: self.config.clone(),
            router: self.router.clone(),
            registry: self.registry.clone(),
            shutdown: shutdown.clone(),
        });

        let acceptor = tokio::spawn(Self::accept_loop(listener, context.clone()));
        let reaper = tokio::spawn(run_reaper(
            self.registry.clone(),
            shutdown,
            self.config.reap_interval(),
        ));

        self.running = Some(Running {
            context,
            acceptor,
            reaper,
            local_addr,
        });
        Ok(local_addr)
    }

    /// Stop accepting, stop the reaper and release the listening socket.
    ///
    /// Connections waiting for their next request are closed. A connection
    /// in the middle of a request finishes that cycle and answers with
    /// `Connection: close`. Returns `false` if the server was not running or a
    /// background task failed.
    pub async fn close(&mut self) -> bool {
        let Some(running) = self.running.take() else {
            return false;
        };

        info!("Shutting down server...");
        running.context.shutdown.trigger();

        // The acceptor owns the listener and drops it on exit
        let acceptor_ok = match running.acceptor.await {
            Ok(()) => true,
            Err(e) => {
                error!("Acceptor task failed: {e}");
                false
            }
        };
        let reaper_ok = match running.reaper.await {
            Ok(()) => true,
            Err(e) => {
                error!("Reaper task failed: {e}");
                false
            }
        };

        info!(
            "Server shutdown complete, {count} connections finishing their last request",
            count = self.registry.len()
        );
        acceptor_ok && reaper_ok
    }

    /// Launch, wait for Ctrl+C, then close.
    pub async fn serve_until_ctrl_c(&mut self, port: u16) -> Result<(), Error> {
        self.launch(port).await?;

        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
            Err(e) => error!("Error setting up Ctrl+C handler: {e}"),
        }

        self.close().await;
        Ok(())
    }

    /// Display the listening address and registered endpoints.
    fn display_server_info(&self, addr: SocketAddr) {
        info!(
            "Server listening on http://{addr} ({version})",
            version = self.config.version
        );
        info!("Registered endpoints:");
        for path in self.router.paths() {
            info!("  {path}");
        }
    }

    /// Set up the TCP listener.
    async fn setup_listener(&self, port: u16) -> Result<TcpListener, Error> {
        let addr = SocketAddr::new(self.config.host, port);
        TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })
    }

    /// Accept connections until shutdown, re-checking the signal after every
    /// poll interval.
    async fn accept_loop(listener: TcpListener, context: Arc<ConnectionContext>) {
        let poll_interval = context.config.accept_poll_interval();

        while !context.shutdown.is_triggered() {
            match time::timeout(poll_interval, listener.accept()).await {
                Err(_elapsed) => continue,
                Ok(Ok((socket, addr))) => Self::handle_new_connection(socket, addr, &context),
                Ok(Err(e)) => {
                    if Self::handle_connection_error(e).await {
                        break;
                    }
                }
            }
        }

        info!("Acceptor stopped");
    }

    /// Register a new connection and spawn its handler task.
    fn handle_new_connection(socket: TcpStream, addr: SocketAddr, context: &Arc<ConnectionContext>) {
        let (id, closer) = context.registry.register(Some(addr));
        debug!("Accepted connection {id} from {addr}");

        // TODO: cap concurrent connections with a semaphore-backed worker pool
        let mut connection = Connection::new(id, socket, closer, context.clone());
        tokio::spawn(async move {
            connection.run().await;
        });
    }

    /// Handle accept errors. Returns `true` if the loop must stop.
    async fn handle_connection_error(e: std::io::Error) -> bool {
        error!("Error accepting connection: {e}");

        if e.kind() == std::io::ErrorKind::BrokenPipe {
            error!("Critical error accepting connection, shutting down");
            return true;
        }

        // For other errors, wait a bit before retrying
        time::sleep(time::Duration::from_millis(100)).await;
        false
    }
}
