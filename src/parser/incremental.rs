//! Streaming parser assembling one message from arbitrarily split chunks.

use std::marker::PhantomData;

use crate::message::{Error, Request, Response};
use crate::parser::derive::{self, FromHead, SEPARATOR};

/// Progress of a [`MessageParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// The header/body separator has not been seen yet.
    AccumulatingHeader,
    /// The header section is complete and `content_length` body bytes are expected.
    BodyPending { content_length: usize },
    /// A full message has been assembled.
    Complete,
}

/// Incremental parser for one HTTP message.
///
/// Bytes are fed with [`append_data`](MessageParser::append_data) as they
/// arrive. The header buffer grows until it ends with a blank line; anything
/// after it is body, framed by `Content-Length` (zero when absent).
#[derive(Debug)]
pub struct MessageParser<M> {
    header: Vec<u8>,
    body: Vec<u8>,
    state: ParseState,
    _message: PhantomData<fn() -> M>,
}

/// Parser for inbound requests.
pub type RequestParser = MessageParser<Request>;

/// Parser for responses read back from a peer.
pub type ResponseParser = MessageParser<Response>;

impl<M: FromHead> MessageParser<M> {
    /// Create a parser that has received no data.
    pub fn new() -> Self {
        Self {
            header: Vec::new(),
            body: Vec::new(),
            state: ParseState::AccumulatingHeader,
            _message: PhantomData,
        }
    }

    /// Current progress.
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Whether a full message has been assembled.
    pub fn is_complete(&self) -> bool {
        self.state == ParseState::Complete
    }

    /// Whether no bytes have been received yet.
    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
    }

    /// Feed the next chunk. Returns `true` once the message is complete.
    ///
    /// An empty chunk changes nothing. Bytes received after completion are not
    /// part of this message and are dropped, as are body bytes beyond the
    /// declared `Content-Length`.
    pub fn append_data(&mut self, chunk: &[u8]) -> bool {
        if chunk.is_empty() {
            return self.is_complete();
        }

        match self.state {
            ParseState::Complete => {}
            ParseState::BodyPending { .. } => self.body.extend_from_slice(chunk),
            ParseState::AccumulatingHeader => {
                // Search the accumulated buffer, backing up far enough to catch a
                // separator split across two chunks.
                let search_from = self.header.len().saturating_sub(SEPARATOR.len() - 1);
                self.header.extend_from_slice(chunk);

                if let Some(offset) = derive::find_separator(&self.header[search_from..]) {
                    let header_end = search_from + offset + SEPARATOR.len();
                    let body = self.header.split_off(header_end);
                    self.body.extend_from_slice(&body);

                    let content_length = derive::content_length(&self.head());
                    self.state = ParseState::BodyPending { content_length };
                }
            }
        }

        if let ParseState::BodyPending { content_length } = self.state {
            if self.body.len() >= content_length {
                self.body.truncate(content_length);
                self.state = ParseState::Complete;
            }
        }

        self.is_complete()
    }

    /// Build the assembled message.
    ///
    /// Returns [`Error::EmptyMessage`] before any data arrived and
    /// [`Error::Incomplete`] while the message is still being received.
    ///
    /// `Content-Length` is recomputed from the body, so a received
    /// `Content-Length: 0` does not appear on the rebuilt message.
    pub fn message(&self) -> Result<M, Error> {
        if self.is_empty() {
            return Err(Error::EmptyMessage);
        }
        if !self.is_complete() {
            return Err(Error::Incomplete);
        }

        derive::build_message(&self.head(), &self.body)
    }

    /// Discard all received data.
    pub fn reset(&mut self) {
        self.header.clear();
        self.body.clear();
        self.state = ParseState::AccumulatingHeader;
    }

    fn head(&self) -> String {
        String::from_utf8_lossy(&self.header).into_owned()
    }
}

impl<M: FromHead> Default for MessageParser<M> {
    fn default() -> Self {
        Self::new()
    }
}
