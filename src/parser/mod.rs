//! Incremental HTTP message parser.
//!
//! One generic state machine assembles both requests and responses from byte
//! chunks of any size. Field extraction happens lazily against the completed
//! header section.

mod derive;
mod incremental;

// Re-export public items
pub use derive::{content_length, content_type, header_value, method, version, FromHead};
pub use incremental::{MessageParser, ParseState, RequestParser, ResponseParser};
