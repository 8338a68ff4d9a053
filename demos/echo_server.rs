//! An echo server demonstrating routing, JSON bodies and persistent connections.

use log::info;
use microhttpd_rs::{
    ContentType, HttpMessage, HttpServer, HttpVersion, Request, RequestHandler, Response,
    ServerConfig, StatusCode,
};
use serde::Serialize;

/// Sends the request body back with the same media type.
struct Echo;

impl RequestHandler for Echo {
    fn handle_request(&self, request: &Request) -> Response {
        let mut response = Response::new(HttpVersion::Http11, StatusCode::Ok);
        response.set_content_type(request.content_type().or(Some(ContentType::Text)));
        response.append_body(request.body());
        response
    }
}

#[derive(Serialize)]
struct Info<'a> {
    method: String,
    path: &'a str,
    host: Option<&'a str>,
    headers: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize the logger
    env_logger::init();

    // Defaults, optionally overridden by a JSON file given as first argument
    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => ServerConfig::default(),
    };

    let mut server = HttpServer::new(config)?;

    server.register("/", |_req: &Request| {
        Response::new(HttpVersion::Http11, StatusCode::Ok)
            .with_content_type(ContentType::Html)
            .with_body_string("<html><body><h1>Welcome to microhttpd-rs!</h1></body></html>")
    });

    server.register("/echo", Echo);

    server.register("/hello", |req: &Request| {
        let params = req.query_params();
        let name = params.get("name").map_or("World", String::as_str);
        Response::new(HttpVersion::Http11, StatusCode::Ok)
            .with_content_type(ContentType::Text)
            .with_body_string(format!("Hello, {name}!"))
    });

    server.register("/info", |req: &Request| {
        let info = Info {
            method: req.method.to_string(),
            path: req.path(),
            host: req.host(),
            headers: req.headers().len(),
        };
        Response::new(HttpVersion::Http11, StatusCode::Ok)
            .with_json(&info)
            .unwrap_or_else(|e| {
                Response::new(HttpVersion::Http11, StatusCode::InternalServerError)
                    .with_body_string(e.to_string())
            })
    });

    server.register("/teapot", |_req: &Request| {
        Response::new(HttpVersion::Http11, StatusCode::Ok)
            .with_reason("Short And Stout")
            .with_body_string("Brewing")
    });

    info!("Try: curl -v http://127.0.0.1:8080/echo -d 'hello'");

    // Run until Ctrl+C
    server.serve_until_ctrl_c(8080).await?;

    Ok(())
}
