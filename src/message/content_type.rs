//! Media types understood by the engine.

use std::fmt;

/// The media types a message body can be labelled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Text,
    Html,
    Json,
    Yaml,
    Xml,
    Gif,
    Ico,
    Png,
}

/// Substrings probed when classifying a `Content-Type` value.
///
/// The candidate matching at the smallest offset wins. When several match at
/// the same offset the one listed first wins, which is why the specific
/// `text/...` types precede the bare `text` catch-all. This is a heuristic and
/// not a full media type parser.
const SNIFF_CANDIDATES: [(&str, ContentType); 12] = [
    ("text/html", ContentType::Html),
    ("text/json", ContentType::Json),
    ("text/yaml", ContentType::Yaml),
    ("text/xml", ContentType::Xml),
    ("application/html", ContentType::Html),
    ("application/json", ContentType::Json),
    ("application/x-yaml", ContentType::Yaml),
    ("application/xml", ContentType::Xml),
    ("image/gif", ContentType::Gif),
    ("image/x-icon", ContentType::Ico),
    ("image/png", ContentType::Png),
    ("text", ContentType::Text),
];

impl ContentType {
    /// The canonical MIME string written into the `Content-Type` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text/plain",
            ContentType::Html => "text/html",
            ContentType::Json => "application/json",
            ContentType::Yaml => "application/x-yaml",
            ContentType::Xml => "text/xml",
            ContentType::Gif => "image/gif",
            ContentType::Ico => "image/x-icon",
            ContentType::Png => "image/png",
        }
    }

    /// Classify a raw `Content-Type` header value.
    pub fn sniff(value: &str) -> Option<Self> {
        SNIFF_CANDIDATES
            .iter()
            .filter_map(|(needle, kind)| value.find(needle).map(|offset| (offset, *kind)))
            // min_by_key keeps the first of equal keys, preserving list order on ties
            .min_by_key(|(offset, _)| *offset)
            .map(|(_, kind)| kind)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
