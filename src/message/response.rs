//! HTTP response representation.

use serde::Serialize;

use crate::message::content_type::ContentType;
use crate::message::error::Error;
use crate::message::http_message::{HttpMessage, MessageParts};
use crate::message::status::StatusCode;
use crate::message::version::HttpVersion;

/// Represents an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP status code
    pub status: StatusCode,
    reason: String,
    parts: MessageParts,
}

impl Response {
    /// Create a new response carrying the standard reason phrase of `status`.
    pub fn new(version: HttpVersion, status: StatusCode) -> Self {
        Self {
            version,
            status,
            reason: status.reason_phrase().to_string(),
            parts: MessageParts::default(),
        }
    }

    /// The reason phrase sent on the status line.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Replace the reason phrase. Line breaks are stripped so the status line
    /// stays on one line.
    pub fn set_reason(&mut self, reason: &str) {
        self.reason = reason.replace(['\r', '\n'], "").trim().to_string();
    }

    /// Builder form of [`Response::set_reason`].
    pub fn with_reason(mut self, reason: &str) -> Self {
        self.set_reason(reason);
        self
    }

    /// Set the response body with a JSON value.
    ///
    /// This method serializes the provided value to JSON and sets it as the response body.
    pub fn with_json<T: Serialize>(self, value: &T) -> Result<Self, Error> {
        let json = serde_json::to_vec(value)?;
        Ok(self
            .with_content_type(ContentType::Json)
            .with_body_bytes(json))
    }
}

impl HttpMessage for Response {
    fn start_line(&self) -> String {
        format!("{} {} {}", self.version, self.status.as_u16(), self.reason)
    }

    fn parts(&self) -> &MessageParts {
        &self.parts
    }

    fn parts_mut(&mut self) -> &mut MessageParts {
        &mut self.parts
    }
}
