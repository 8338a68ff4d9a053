//! Extraction of message fields from a completed header section.
//!
//! Everything here works on the raw header text by plain substring search, the
//! same way for requests and responses. Only the start line differs, which is
//! what [`FromHead`] abstracts over.

use std::str::FromStr;

use crate::message::{
    ContentType, Error, HttpMessage, HttpVersion, Method, Request, Response, StatusCode,
};

/// Blank line separating the header section from the body.
pub(crate) const SEPARATOR: &[u8] = b"\r\n\r\n";

const CRLF: &str = "\r\n";

/// Messages that can be rebuilt from their start line.
pub trait FromHead: HttpMessage {
    /// Build an empty message from the first line of a header section.
    fn from_start_line(line: &str) -> Result<Self, Error>;
}

impl FromHead for Request {
    fn from_start_line(line: &str) -> Result<Self, Error> {
        let method = method(line)?;
        let version = version(line)?;

        let target = &line[method.as_str().len()..];
        let uri = match target.find(" HTTP/") {
            Some(end) => target[..end].trim(),
            None => return Err(Error::MalformedStartLine(line.to_string())),
        };
        if uri.is_empty() {
            return Err(Error::MalformedStartLine(line.to_string()));
        }

        Ok(Request::new(method, uri, version))
    }
}

impl FromHead for Response {
    fn from_start_line(line: &str) -> Result<Self, Error> {
        let (version, rest) = line
            .split_once(' ')
            .ok_or_else(|| Error::MalformedStartLine(line.to_string()))?;
        let version = HttpVersion::from_str(version)?;

        let (code, reason) = rest.split_once(' ').unwrap_or((rest, ""));
        let status = code
            .trim()
            .parse::<u16>()
            .ok()
            .and_then(StatusCode::from_u16)
            .ok_or_else(|| Error::InvalidStatus(code.to_string()))?;

        let mut response = Response::new(version, status);
        if !reason.trim().is_empty() {
            response.set_reason(reason);
        }
        Ok(response)
    }
}

/// Build a message from a complete header section and the body bytes.
pub(crate) fn build_message<M: FromHead>(head: &str, body: &[u8]) -> Result<M, Error> {
    let start_line = head.split(CRLF).next().unwrap_or_default();
    let mut message = M::from_start_line(start_line)?;

    for (name, value) in header_lines(head) {
        message.set_header(name, value);
    }
    message.parts_mut().content_type = content_type(head);
    message.append_body(body);

    Ok(message)
}

/// The method whose keyword prefixes the header section.
pub fn method(head: &str) -> Result<Method, Error> {
    Method::ALL
        .into_iter()
        .find(|method| {
            head.strip_prefix(method.as_str())
                .is_some_and(|rest| rest.starts_with(' '))
        })
        .ok_or_else(|| {
            let token = head.split_whitespace().next().unwrap_or_default();
            Error::InvalidMethod(token.to_string())
        })
}

/// The protocol version token found on the start line.
pub fn version(head: &str) -> Result<HttpVersion, Error> {
    let start_line = head.split(CRLF).next().unwrap_or_default();
    start_line
        .split_whitespace()
        .find(|token| token.starts_with("HTTP/"))
        .ok_or_else(|| Error::MalformedStartLine(start_line.to_string()))
        .and_then(HttpVersion::from_str)
}

/// The classified media type of the `Content-Type` header, if any.
pub fn content_type(head: &str) -> Option<ContentType> {
    header_value(head, "Content-Type").and_then(ContentType::sniff)
}

/// The declared body length; zero when absent or not a plain decimal number.
pub fn content_length(head: &str) -> usize {
    header_value(head, "Content-Length")
        .filter(|value| !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

/// The value of the first header line named `name`.
pub fn header_value<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    header_lines(head)
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim())
}

/// `(name, value)` pairs of every header line. Lines without a `:` are skipped.
fn header_lines(head: &str) -> impl Iterator<Item = (&str, &str)> {
    head.split(CRLF)
        .skip(1)
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
}

/// Offset of the first header/body separator in `buf`.
pub(crate) fn find_separator(buf: &[u8]) -> Option<usize> {
    buf.windows(SEPARATOR.len())
        .position(|window| window == SEPARATOR)
}
