//! HTTP message model.
//!
//! Requests and responses share one header collection type and one set of
//! body operations through [`HttpMessage`]. Mutating the body or the media type
//! keeps the `Content-Length` and `Content-Type` headers consistent.

mod content_type;
mod error;
mod headers;
mod http_message;
mod method;
mod request;
mod response;
mod status;
mod version;

// Re-export public items
pub use content_type::ContentType;
pub use error::Error;
pub use headers::Headers;
pub use http_message::{HttpMessage, MessageParts};
pub use method::Method;
pub use request::Request;
pub use response::Response;
pub use status::StatusCode;
pub use version::HttpVersion;
