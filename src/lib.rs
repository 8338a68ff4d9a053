//! A small embeddable HTTP/1.x server library.
//!
//! This library provides an incremental HTTP message parser, a request and
//! response model, and an async server that routes requests by path prefix.
//!
//! # Features
//!
//! - Assemble requests and responses from byte chunks of any size
//! - Header collection with normalized, case-insensitive keys
//! - Body and media type bookkeeping that keeps `Content-Length` and `Content-Type` in sync
//! - Support for HTTP versions 1.0 and 1.1, with persistent connections in 1.1
//! - JSON serialization and deserialization for request and response bodies
//! - Longest-prefix routing to synchronous handlers
//! - Per-connection request budgets and idle connection reaping
//!
//! # Examples
//!
//! ## Incremental parsing
//!
//! ```
//! use microhttpd_rs::{HttpMessage, Method, RequestParser};
//!
//! let mut parser = RequestParser::new();
//! assert!(!parser.append_data(b"POST /submit HTTP/1.1\r\nContent-Le"));
//! assert!(!parser.append_data(b"ngth: 5\r\n\r\nhel"));
//! assert!(parser.append_data(b"lo"));
//!
//! let request = parser.message().unwrap();
//! assert_eq!(request.method, Method::POST);
//! assert_eq!(request.uri, "/submit");
//! assert_eq!(request.body(), b"hello");
//! ```
//!
//! ## Error handling
//!
//! ```
//! use microhttpd_rs::{MessageError, RequestParser};
//!
//! let mut parser = RequestParser::new();
//! assert!(matches!(parser.message(), Err(MessageError::EmptyMessage)));
//!
//! parser.append_data(b"BREW /pot HTTP/1.1\r\n\r\n");
//! match parser.message() {
//!     Ok(_) => println!("Request parsed successfully"),
//!     Err(MessageError::InvalidMethod(token)) => println!("Invalid method: {}", token),
//!     Err(err) => println!("Other error: {}", err),
//! }
//! ```
//!
//! ## JSON support
//!
//! ```
//! use microhttpd_rs::{ContentType, HttpMessage, HttpVersion, Response, StatusCode};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     name: String,
//!     email: String,
//! }
//!
//! let user = User {
//!     name: "John Doe".to_string(),
//!     email: "john@example.com".to_string(),
//! };
//!
//! let response = Response::new(HttpVersion::Http11, StatusCode::Ok)
//!     .with_json(&user)
//!     .unwrap();
//! assert_eq!(response.content_type(), Some(ContentType::Json));
//! ```
//!
//! ## Serving
//!
//! ```no_run
//! use microhttpd_rs::{HttpMessage, HttpServer, HttpVersion, Request, Response, ServerConfig, StatusCode};
//!
//! # async fn run() -> Result<(), microhttpd_rs::ServerError> {
//! let mut server = HttpServer::new(ServerConfig::default())?;
//! server.register("/", |_req: &Request| {
//!     Response::new(HttpVersion::Http11, StatusCode::Ok).with_body_string("Hello")
//! });
//! server.serve_until_ctrl_c(8080).await
//! # }
//! ```
//!
//! See the `demos` directory for a complete server.

pub mod message;
pub mod parser;
pub mod server;

// Re-export commonly used items for convenience
pub use message::{
    ContentType, Error as MessageError, Headers, HttpMessage, HttpVersion, Method, Request,
    Response, StatusCode,
};
pub use parser::{MessageParser, ParseState, RequestParser, ResponseParser};
pub use server::{Error as ServerError, HttpServer, RequestHandler, Router, ServerConfig};
