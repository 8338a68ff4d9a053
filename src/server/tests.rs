//! Tests for the HTTP server implementation.

#[cfg(test)]
mod server_tests {
    use std::collections::VecDeque;
    use std::io;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};
    use std::time::{Duration, Instant};

    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
    use tokio::net::TcpStream;
    use tokio::time;

    use crate::message::{ContentType, HttpMessage, HttpVersion, Request, Response, StatusCode};
    use crate::parser::ResponseParser;
    use crate::server::{
        run_reaper, Clock, Connection, ConnectionContext, ConnectionRegistry, Error, HttpServer,
        RequestHandler, Router, ServerConfig, ShutdownSignal,
    };

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    // Clock that only moves when told to
    struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: Mutex::new(Instant::now()),
            }
        }

        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }

    // Mock TcpStream handing out one queued chunk per read, then EOF
    struct MockTcpStream {
        chunks: VecDeque<Vec<u8>>,
        write_data: Vec<u8>,
    }

    impl MockTcpStream {
        fn new(chunks: Vec<&[u8]>) -> Self {
            Self {
                chunks: chunks.into_iter().map(<[u8]>::to_vec).collect(),
                write_data: Vec::new(),
            }
        }

        fn written_data(&self) -> &[u8] {
            &self.write_data
        }
    }

    impl AsyncRead for MockTcpStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            if let Some(mut chunk) = this.chunks.pop_front() {
                let n = chunk.len().min(buf.remaining());
                buf.put_slice(&chunk[..n]);
                if n < chunk.len() {
                    this.chunks.push_front(chunk.split_off(n));
                }
            }
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for MockTcpStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            this.write_data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    // Answers with the request body and content type
    struct EchoHandler;

    impl RequestHandler for EchoHandler {
        fn handle_request(&self, request: &Request) -> Response {
            let mut response = Response::new(HttpVersion::Http11, StatusCode::Ok);
            response.set_content_type(request.content_type());
            response.append_body(request.body());
            response
        }
    }

    fn text_handler(text: &'static str) -> impl RequestHandler {
        move |_req: &Request| {
            Response::new(HttpVersion::Http11, StatusCode::Ok)
                .with_content_type(ContentType::Text)
                .with_body_string(text)
        }
    }

    fn test_router() -> Router {
        let mut router = Router::new();
        assert!(router.register("/test", text_handler("Test response")));
        router
    }

    fn context(config: ServerConfig, router: Router, clock: Arc<dyn Clock>) -> Arc<ConnectionContext> {
        let registry =
            ConnectionRegistry::with_clock(clock, config.idle_timeout(), config.request_budget);
        Arc::new(ConnectionContext {
            config,
            router: Arc::new(router),
            registry: Arc::new(registry),
            shutdown: Arc::new(ShutdownSignal::new()),
        })
    }

    async fn serve_mock(context: &Arc<ConnectionContext>, chunks: Vec<&[u8]>) -> String {
        let (id, closer) = context.registry.register(None);
        let mut connection =
            Connection::new(id, MockTcpStream::new(chunks), closer, context.clone());
        connection.run().await;
        String::from_utf8_lossy(connection.into_inner().written_data()).into_owned()
    }

    async fn read_response<S: AsyncRead + Unpin>(stream: &mut S) -> Response {
        let mut parser = ResponseParser::new();
        let mut buf = [0u8; 512];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before a full response arrived");
            if parser.append_data(&buf[..n]) {
                return parser.message().unwrap();
            }
        }
    }

    const GET_TEST: &[u8] = b"GET /test HTTP/1.1\r\nHost: localhost\r\n\r\n";

    #[test]
    fn test_server_creation() {
        let server = HttpServer::new(ServerConfig::default()).unwrap();
        assert_eq!(server.config().request_budget, 125);
        assert_eq!(server.config().idle_timeout(), Duration::from_secs(100));
        assert!(server.local_addr().is_none());
        assert!(server.registry().is_empty());
    }

    #[test]
    fn test_unsupported_version_is_rejected() {
        let config = ServerConfig {
            version: HttpVersion::Http20,
            ..ServerConfig::default()
        };
        assert!(matches!(
            HttpServer::new(config),
            Err(Error::UnsupportedVersion(HttpVersion::Http20))
        ));
    }

    #[test]
    fn test_config_from_json() {
        let config =
            ServerConfig::from_json(r#"{"version": "HTTP/1.0", "request_budget": 3}"#).unwrap();
        assert_eq!(config.version, HttpVersion::Http10);
        assert_eq!(config.request_budget, 3);
        assert_eq!(config.read_buffer_size, ServerConfig::default().read_buffer_size);

        assert!(matches!(ServerConfig::from_json("{nope"), Err(Error::Config(_))));
    }

    #[test]
    fn test_register_rejects_malformed_and_duplicate_paths() {
        let mut router = Router::new();
        assert!(router.register("/a", EchoHandler));
        assert!(!router.register("a", EchoHandler));
        assert!(!router.register("", EchoHandler));
        assert!(!router.register("/a", EchoHandler));
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn test_longest_prefix_dispatch() {
        let mut router = Router::new();
        assert!(router.register("/", text_handler("root")));
        assert!(router.register("/a", text_handler("a")));
        assert!(router.register("/a/b", text_handler("a/b")));

        let request = Request::new(crate::message::Method::GET, "/", HttpVersion::Http11);
        let answer = |uri: &str| {
            router
                .dispatch(uri)
                .map(|handler| handler.handle_request(&request).body_string())
        };

        assert_eq!(answer("/a/b/c").as_deref(), Some("a/b"));
        assert_eq!(answer("/a/x").as_deref(), Some("a"));
        assert_eq!(answer("/x").as_deref(), Some("root"));
        assert_eq!(answer("/").as_deref(), Some("root"));
    }

    #[test]
    fn test_dispatch_on_empty_table() {
        let router = Router::new();
        assert!(router.dispatch("/anything").is_none());
    }

    #[test]
    fn test_routes_ordered_by_specificity() {
        let mut router = Router::new();
        for path in ["/", "/a", "/ab", "/a/b", "/z", "/a/b/c"] {
            assert!(router.register(path, EchoHandler));
        }

        let paths: Vec<&str> = router.paths().collect();
        assert_eq!(paths, vec!["/a/b/c", "/a/b", "/z", "/ab", "/a", "/"]);
    }

    #[tokio::test]
    async fn test_handle_connection_with_valid_request() {
        init_logger();
        let context = context(ServerConfig::default(), test_router(), Arc::new(ManualClock::new()));

        let response = serve_mock(&context, vec![GET_TEST]).await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: text/plain\r\n"));
        assert!(response.contains("Server: microhttpd-rs\r\n"));
        assert!(response.contains("Connection: keep-alive\r\n"));
        assert!(response.contains("Keep-Alive: timeout=100, max=124\r\n"));
        assert!(response.ends_with("\r\n\r\nTest response"));
        assert!(context.registry.is_empty());
    }

    #[tokio::test]
    async fn test_handle_connection_with_not_found() {
        let context = context(ServerConfig::default(), test_router(), Arc::new(ManualClock::new()));

        let response =
            serve_mock(&context, vec![&b"GET /nonexistent HTTP/1.1\r\nHost: localhost\r\n\r\n"[..]]).await;

        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(response.contains("Not found: /nonexistent"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_invalid_request() {
        let context = context(ServerConfig::default(), test_router(), Arc::new(ManualClock::new()));

        let response = serve_mock(&context, vec![&b"INVALID REQUEST\r\n\r\n"[..], GET_TEST]).await;

        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(response.contains("Connection: close\r\n"));
        assert!(response.contains("Error parsing request:"));
        assert_eq!(response.matches("HTTP/1.1").count(), 1);
    }

    #[tokio::test]
    async fn test_request_split_across_reads() {
        let context = context(ServerConfig::default(), test_router(), Arc::new(ManualClock::new()));

        let response = serve_mock(
            &context,
            vec![
                &b"GET /te"[..],
                &b"st HTTP/1.1\r\nHo"[..],
                &b"st: localhost\r\n\r"[..],
                &b"\n"[..],
            ],
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("Test response"));
    }

    #[tokio::test]
    async fn test_persistent_connection_serves_multiple_requests() {
        let context = context(ServerConfig::default(), test_router(), Arc::new(ManualClock::new()));

        let response = serve_mock(&context, vec![GET_TEST, GET_TEST, GET_TEST]).await;

        assert_eq!(response.matches("HTTP/1.1 200 OK\r\n").count(), 3);
        assert!(response.contains("max=122\r\n"));
    }

    #[tokio::test]
    async fn test_budget_closes_connection_after_exactly_n_requests() {
        let config = ServerConfig {
            request_budget: 2,
            ..ServerConfig::default()
        };
        let context = context(config, test_router(), Arc::new(ManualClock::new()));

        let response = serve_mock(&context, vec![GET_TEST, GET_TEST, GET_TEST]).await;

        assert_eq!(response.matches("HTTP/1.1 200 OK\r\n").count(), 2);
        assert!(response.contains("Keep-Alive: timeout=100, max=1\r\n"));
        let last = response.rsplit("HTTP/1.1 200 OK\r\n").next().unwrap();
        assert!(last.contains("Connection: close\r\n"));
        assert!(!last.contains("Keep-Alive"));
    }

    #[tokio::test]
    async fn test_non_persistent_mode_serves_one_request() {
        let config = ServerConfig {
            version: HttpVersion::Http10,
            ..ServerConfig::default()
        };
        let context = context(config, test_router(), Arc::new(ManualClock::new()));

        let response = serve_mock(&context, vec![GET_TEST, GET_TEST]).await;

        assert_eq!(response.matches("200 OK").count(), 1);
        assert!(response.contains("Connection: close\r\n"));
    }

    #[tokio::test]
    async fn test_http10_request_is_not_kept_alive() {
        let context = context(ServerConfig::default(), test_router(), Arc::new(ManualClock::new()));

        let response = serve_mock(
            &context,
            vec![&b"GET /test HTTP/1.0\r\n\r\n"[..], GET_TEST],
        )
        .await;

        assert_eq!(response.matches("200 OK").count(), 1);
        assert!(response.contains("Connection: close\r\n"));
    }

    #[tokio::test]
    async fn test_http10_response_is_not_kept_alive() {
        let mut router = Router::new();
        router.register("/", |_req: &Request| {
            Response::new(HttpVersion::Http10, StatusCode::Ok).with_body_string("old")
        });
        let context = context(ServerConfig::default(), router, Arc::new(ManualClock::new()));

        let response = serve_mock(&context, vec![GET_TEST, GET_TEST]).await;

        assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
        assert_eq!(response.matches("200 OK").count(), 1);
        assert!(response.contains("Connection: close\r\n"));
    }

    #[test]
    fn test_reaper_evicts_idle_connections() {
        let clock = Arc::new(ManualClock::new());
        let registry = ConnectionRegistry::with_clock(clock.clone(), Duration::from_secs(100), 125);

        let (idle, idle_closer) = registry.register(None);
        clock.advance(Duration::from_secs(60));
        let (busy, busy_closer) = registry.register(None);

        clock.advance(Duration::from_secs(40));
        // Exactly at the timeout is not yet idle
        assert_eq!(registry.reap_idle(), 0);

        clock.advance(Duration::from_secs(1));
        assert_eq!(registry.reap_idle(), 1);
        assert!(idle_closer.is_triggered());
        assert!(!busy_closer.is_triggered());
        assert!(!registry.is_alive(idle));
        assert!(registry.is_alive(busy));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reaping_ignores_remaining_budget() {
        let clock = Arc::new(ManualClock::new());
        let registry = ConnectionRegistry::with_clock(clock.clone(), Duration::from_secs(100), 125);

        let (id, closer) = registry.register(None);
        assert_eq!(registry.record_request(id), Some(124));

        clock.advance(Duration::from_secs(101));
        assert_eq!(registry.reap_idle(), 1);
        assert!(closer.is_triggered());
        assert_eq!(registry.record_request(id), None);
    }

    #[test]
    fn test_activity_postpones_reaping() {
        let clock = Arc::new(ManualClock::new());
        let registry = ConnectionRegistry::with_clock(clock.clone(), Duration::from_secs(100), 125);

        let (id, _closer) = registry.register(None);
        clock.advance(Duration::from_secs(90));
        registry.record_request(id);
        clock.advance(Duration::from_secs(90));

        assert_eq!(registry.reap_idle(), 0);
        assert!(registry.is_alive(id));
    }

    #[test]
    fn test_exhausted_budget_is_not_alive() {
        let registry = ConnectionRegistry::new(Duration::from_secs(100), 1);
        let (id, _closer) = registry.register(None);

        assert!(registry.is_alive(id));
        assert_eq!(registry.record_request(id), Some(0));
        assert_eq!(registry.remaining_requests(id), Some(0));
        assert!(!registry.is_alive(id));

        assert!(registry.remove(id));
        assert_eq!(registry.remaining_requests(id), None);
    }

    #[test]
    fn test_shared_handler_serves_several_routes() {
        let shared: Arc<dyn RequestHandler> = Arc::new(EchoHandler);
        let mut router = Router::new();
        assert!(router.register_shared("/one", shared.clone()));
        assert!(router.register_shared("/two", shared));
        assert!(router.dispatch("/two/x").is_some());
        assert!(router.dispatch("/three").is_none());
    }

    #[tokio::test]
    async fn test_reaper_loop_runs_until_shutdown() {
        init_logger();
        let clock = Arc::new(ManualClock::new());
        let registry = Arc::new(ConnectionRegistry::with_clock(
            clock.clone(),
            Duration::from_secs(100),
            125,
        ));
        let shutdown = Arc::new(ShutdownSignal::new());

        let (_id, closer) = registry.register(None);
        let reaper = tokio::spawn(run_reaper(
            registry.clone(),
            shutdown.clone(),
            Duration::from_millis(5),
        ));

        clock.advance(Duration::from_secs(101));
        time::timeout(Duration::from_secs(5), closer.triggered())
            .await
            .expect("idle connection was not reaped");
        assert!(registry.is_empty());

        assert!(shutdown.trigger());
        time::timeout(Duration::from_secs(5), reaper)
            .await
            .expect("reaper did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_reaped_connection_is_shut_down() {
        let clock = Arc::new(ManualClock::new());
        let context = context(ServerConfig::default(), test_router(), clock.clone());
        let (mut client, server) = tokio::io::duplex(4096);

        let (id, closer) = context.registry.register(None);
        let task_context = context.clone();
        let task = tokio::spawn(async move {
            let mut connection = Connection::new(id, server, closer, task_context);
            connection.run().await;
        });

        client.write_all(GET_TEST).await.unwrap();
        let response = read_response(&mut client).await;
        assert_eq!(response.status, StatusCode::Ok);
        assert!(response.has_header_value("Connection", "keep-alive"));

        clock.advance(Duration::from_secs(101));
        assert_eq!(context.registry.reap_idle(), 1);

        time::timeout(Duration::from_secs(5), task)
            .await
            .expect("connection task did not stop")
            .unwrap();

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_reaping_aborts_a_stalled_write() {
        init_logger();
        let clock = Arc::new(ManualClock::new());
        let mut router = Router::new();
        router.register("/big", |_req: &Request| {
            Response::new(HttpVersion::Http11, StatusCode::Ok).with_body_bytes(vec![b'x'; 1 << 20])
        });
        let context = context(ServerConfig::default(), router, clock.clone());
        // The client never reads, so the 64 byte pipe fills up mid-response
        let (mut client, server) = tokio::io::duplex(64);

        let (id, closer) = context.registry.register(None);
        let task_context = context.clone();
        let task = tokio::spawn(async move {
            let mut connection = Connection::new(id, server, closer, task_context);
            connection.run().await;
        });

        client
            .write_all(b"GET /big HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        time::timeout(Duration::from_secs(5), async {
            while context.registry.remaining_requests(id) != Some(124) {
                time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("request was never dispatched");

        clock.advance(Duration::from_secs(101));
        assert_eq!(context.registry.reap_idle(), 1);

        time::timeout(Duration::from_secs(5), task)
            .await
            .expect("connection stuck in write was not shut down")
            .unwrap();
        assert!(context.registry.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_completes_a_partial_request() {
        let mut router = Router::new();
        router.register("/", EchoHandler);
        let context = context(ServerConfig::default(), router, Arc::new(ManualClock::new()));
        let (mut client, server) = tokio::io::duplex(4096);

        let (id, closer) = context.registry.register(None);
        let task_context = context.clone();
        let task = tokio::spawn(async move {
            let mut connection = Connection::new(id, server, closer, task_context);
            connection.run().await;
        });

        client
            .write_all(b"POST / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 4\r\n\r\nab")
            .await
            .unwrap();
        // Let the connection take in the first half
        time::sleep(Duration::from_millis(50)).await;

        assert!(context.shutdown.trigger());
        time::sleep(Duration::from_millis(20)).await;
        assert!(!task.is_finished());

        client.write_all(b"cd").await.unwrap();
        let response = read_response(&mut client).await;
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.body(), b"abcd");
        assert!(response.has_header_value("Connection", "close"));
        assert!(!response.has_header("Keep-Alive"));

        time::timeout(Duration::from_secs(5), task)
            .await
            .expect("connection did not close after its last response")
            .unwrap();
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_closes_a_waiting_connection() {
        let context = context(ServerConfig::default(), test_router(), Arc::new(ManualClock::new()));
        let (mut client, server) = tokio::io::duplex(4096);

        let (id, closer) = context.registry.register(None);
        let task_context = context.clone();
        let task = tokio::spawn(async move {
            let mut connection = Connection::new(id, server, closer, task_context);
            connection.run().await;
        });

        client.write_all(GET_TEST).await.unwrap();
        let response = read_response(&mut client).await;
        assert!(response.has_header_value("Connection", "keep-alive"));

        assert!(context.shutdown.trigger());
        time::timeout(Duration::from_secs(5), task)
            .await
            .expect("idle connection survived shutdown")
            .unwrap();
        assert!(context.registry.is_empty());
    }

    #[tokio::test]
    async fn test_partial_request_abandoned_after_shutdown_deadline() {
        let config = ServerConfig {
            idle_timeout_secs: 0,
            ..ServerConfig::default()
        };
        let context = context(config, test_router(), Arc::new(ManualClock::new()));
        let (mut client, server) = tokio::io::duplex(4096);

        let (id, closer) = context.registry.register(None);
        let task_context = context.clone();
        let task = tokio::spawn(async move {
            let mut connection = Connection::new(id, server, closer, task_context);
            connection.run().await;
        });

        client.write_all(b"GET /test HTTP/1.1\r\n").await.unwrap();
        time::sleep(Duration::from_millis(50)).await;
        assert!(context.shutdown.trigger());

        time::timeout(Duration::from_secs(5), task)
            .await
            .expect("stalled partial request kept the connection open")
            .unwrap();
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_launch_serve_and_close() {
        init_logger();
        let mut server = HttpServer::new(ServerConfig::default()).unwrap();
        assert!(server.register("/", text_handler("root")));
        assert!(server.register("/echo", EchoHandler));

        let addr = server.launch(0).await.unwrap();
        assert_eq!(server.local_addr(), Some(addr));
        assert!(!server.register("/late", EchoHandler));
        assert!(matches!(server.launch(0).await, Err(Error::AlreadyLaunched)));

        let mut client = TcpStream::connect(addr).await.unwrap();

        let echo = Request::new(crate::message::Method::POST, "/echo", HttpVersion::Http11)
            .with_host("localhost")
            .with_content_type(ContentType::Json)
            .with_body_string("{\"ping\":true}");
        client.write_all(&echo.to_bytes()).await.unwrap();
        let response = read_response(&mut client).await;
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.content_type(), Some(ContentType::Json));
        assert_eq!(response.body(), b"{\"ping\":true}");
        assert_eq!(response.header("Keep-Alive"), Some("timeout=100, max=124"));

        // Same connection, second request
        client
            .write_all(b"GET /other HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let response = read_response(&mut client).await;
        assert_eq!(response.body(), b"root");
        assert_eq!(server.registry().len(), 1);

        assert!(server.close().await);
        assert!(!server.close().await);

        let mut rest = Vec::new();
        time::timeout(Duration::from_secs(5), client.read_to_end(&mut rest))
            .await
            .expect("connection was not closed")
            .unwrap();
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_launch_reports_bind_failure() {
        let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();

        let mut server = HttpServer::new(ServerConfig::default()).unwrap();
        assert!(matches!(server.launch(port).await, Err(Error::Bind { .. })));
        assert!(server.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_close_without_launch() {
        let mut server = HttpServer::new(ServerConfig::default()).unwrap();
        assert!(!server.close().await);
    }
}
