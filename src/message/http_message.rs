//! Behaviour shared by requests and responses.

use crate::message::content_type::ContentType;
use crate::message::headers::Headers;

/// Headers, body and derived content type of a message.
///
/// Fields are only mutable through [`HttpMessage`], which keeps the
/// `Content-Type` and `Content-Length` fields in step with the body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageParts {
    pub(crate) headers: Headers,
    pub(crate) body: Vec<u8>,
    pub(crate) content_type: Option<ContentType>,
}

/// Common operations on HTTP messages.
///
/// Both [`Request`](crate::message::Request) and
/// [`Response`](crate::message::Response) implement this trait; only the start
/// line differs between them.
pub trait HttpMessage: Sized {
    /// The start line without its trailing CRLF.
    fn start_line(&self) -> String;

    #[doc(hidden)]
    fn parts(&self) -> &MessageParts;

    #[doc(hidden)]
    fn parts_mut(&mut self) -> &mut MessageParts;

    /// The message headers.
    fn headers(&self) -> &Headers {
        &self.parts().headers
    }

    /// Get a header value, ignoring the case of `name`.
    fn header(&self, name: &str) -> Option<&str> {
        self.parts().headers.get(name)
    }

    /// Check if a header exists.
    fn has_header(&self, name: &str) -> bool {
        self.parts().headers.contains(name)
    }

    /// Check if a header exists and carries exactly `value`.
    fn has_header_value(&self, name: &str, value: &str) -> bool {
        self.header(name) == Some(value)
    }

    /// The raw body bytes.
    fn body(&self) -> &[u8] {
        &self.parts().body
    }

    /// The body decoded as UTF-8, replacing invalid sequences.
    fn body_string(&self) -> String {
        String::from_utf8_lossy(self.body()).into_owned()
    }

    /// The declared media type of the body, if any.
    fn content_type(&self) -> Option<ContentType> {
        self.parts().content_type
    }

    /// Add or replace a header. Returns `false` when the field was ignored
    /// because its name or value is empty.
    fn set_header(&mut self, name: &str, value: &str) -> bool {
        self.parts_mut().headers.set(name, value)
    }

    /// Set or clear the media type, updating the `Content-Type` header.
    fn set_content_type(&mut self, content_type: Option<ContentType>) {
        let parts = self.parts_mut();
        parts.content_type = content_type;
        parts.headers.set_content_type(content_type);
    }

    /// Append bytes to the body and recompute `Content-Length`.
    fn append_body(&mut self, data: &[u8]) {
        let parts = self.parts_mut();
        parts.body.extend_from_slice(data);
        let length = parts.body.len();
        parts.headers.set_content_length(length);
    }

    /// Builder form of [`HttpMessage::set_header`].
    fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// Builder form of [`HttpMessage::set_content_type`].
    fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.set_content_type(Some(content_type));
        self
    }

    /// Builder form of [`HttpMessage::append_body`].
    fn with_body_bytes(mut self, body: impl AsRef<[u8]>) -> Self {
        self.append_body(body.as_ref());
        self
    }

    /// Append a string to the body.
    fn with_body_string(self, body: impl AsRef<str>) -> Self {
        self.with_body_bytes(body.as_ref().as_bytes())
    }

    /// Serialize the message to its wire format.
    fn to_bytes(&self) -> Vec<u8> {
        let parts = self.parts();
        let mut bytes = Vec::with_capacity(parts.body.len() + 128);

        bytes.extend_from_slice(self.start_line().as_bytes());
        bytes.extend_from_slice(b"\r\n");
        parts.headers.write_to(&mut bytes);
        bytes.extend_from_slice(b"\r\n");
        bytes.extend_from_slice(&parts.body);

        bytes
    }
}
