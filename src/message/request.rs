//! HTTP request representation.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::message::content_type::ContentType;
use crate::message::error::Error;
use crate::message::http_message::{HttpMessage, MessageParts};
use crate::message::method::Method;
use crate::message::version::HttpVersion;

/// Represents an HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target, including any query string
    pub uri: String,
    /// The HTTP version
    pub version: HttpVersion,
    parts: MessageParts,
}

impl Request {
    /// Create a new request with no headers and an empty body.
    pub fn new(method: Method, uri: impl Into<String>, version: HttpVersion) -> Self {
        Self {
            method,
            uri: uri.into(),
            version,
            parts: MessageParts::default(),
        }
    }

    /// Builder that sets the `Host` header.
    pub fn with_host(self, host: &str) -> Self {
        self.with_header("Host", host)
    }

    /// The value of the `Host` header.
    pub fn host(&self) -> Option<&str> {
        self.header("Host")
    }

    /// The request target without its query string.
    pub fn path(&self) -> &str {
        self.uri
            .split_once('?')
            .map_or(self.uri.as_str(), |(path, _)| path)
    }

    /// Query parameters parsed from the request target.
    pub fn query_params(&self) -> HashMap<String, String> {
        self.uri
            .split_once('?')
            .map(|(_, query)| {
                query
                    .split('&')
                    .filter(|s| !s.is_empty())
                    .map(|pair| match pair.split_once('=') {
                        Some((k, v)) => (k.to_string(), v.to_string()),
                        None => (pair.to_string(), String::new()),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check if the request has a JSON body.
    pub fn is_json(&self) -> bool {
        self.content_type() == Some(ContentType::Json)
    }

    /// Parse the request body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if !self.is_json() {
            return Err(Error::MissingHeader(format!(
                "Content-Type: {}",
                ContentType::Json
            )));
        }

        Ok(serde_json::from_slice(self.body())?)
    }
}

impl HttpMessage for Request {
    fn start_line(&self) -> String {
        format!("{} {} {}", self.method, self.uri, self.version)
    }

    fn parts(&self) -> &MessageParts {
        &self.parts
    }

    fn parts_mut(&mut self) -> &mut MessageParts {
        &mut self.parts
    }
}
