//! Header collection shared by requests and responses.

use crate::message::content_type::ContentType;

pub(crate) const CONTENT_TYPE: &str = "Content-Type";
pub(crate) const CONTENT_LENGTH: &str = "Content-Length";

/// An ordered collection of header fields.
///
/// Field names are unique and compared case-insensitively. Entries are
/// serialized in the order they were first inserted; overwriting a field keeps
/// its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a header value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|index| self.entries[index].1.as_str())
    }

    /// Check if a header exists.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Set a header, overwriting any existing value for the same field.
    ///
    /// The name is normalized with [`Headers::normalize_key`] and the value is
    /// trimmed with inner whitespace runs, line breaks included, reduced to one
    /// space. Fields whose name or value ends up empty, or whose name contains
    /// a `:`, are ignored, in which case `false` is returned.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        let name = Self::normalize_key(name);
        let value = reduce_whitespace(value, " ");
        if name.is_empty() || name.contains(':') || value.is_empty() {
            return false;
        }

        match self.position(&name) {
            Some(index) => self.entries[index].1 = value,
            None => self.entries.push((name, value)),
        }
        true
    }

    /// Remove a header, returning its value if it was present.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|index| self.entries.remove(index).1)
    }

    /// Number of header fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection holds no fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs in serialization order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Add or remove the `Content-Type` field.
    pub fn set_content_type(&mut self, content_type: Option<ContentType>) {
        match content_type {
            Some(content_type) => {
                self.set(CONTENT_TYPE, content_type.as_str());
            }
            None => {
                self.remove(CONTENT_TYPE);
            }
        }
    }

    /// Add, update or remove the `Content-Length` field.
    ///
    /// A length of zero removes the field.
    pub fn set_content_length(&mut self, length: usize) {
        if length > 0 {
            self.set(CONTENT_LENGTH, &length.to_string());
        } else {
            self.remove(CONTENT_LENGTH);
        }
    }

    /// Normalize a field name: trim, join inner whitespace with hyphens and
    /// capitalize each hyphen-separated word (`content  length` becomes
    /// `Content-Length`).
    pub fn normalize_key(name: &str) -> String {
        reduce_whitespace(name, "-")
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.flat_map(char::to_lowercase))
                        .collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Append every field as `Name: Value\r\n`.
    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        for (name, value) in &self.entries {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = Self::normalize_key(name);
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(&name))
    }
}

/// Trim spaces, tabs and line breaks, replacing each inner run of them with
/// `fill`.
fn reduce_whitespace(s: &str, fill: &str) -> String {
    s.split([' ', '\t', '\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(fill)
}
