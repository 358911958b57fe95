//! Parsed message types: header maps and the two message shapes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;
use crate::parser::{header, mime};

/// Value of a header field.
///
/// A name seen once holds a single string. Repeating the name (e.g. several
/// `Received:` lines) promotes it to a list in the order the lines appeared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Single(String),
    Multiple(Vec<String>),
}

impl HeaderValue {
    /// First value (the only one for [`HeaderValue::Single`]).
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Single(v) => Some(v),
            Self::Multiple(vs) => vs.first().map(String::as_str),
        }
    }

    /// Every value in file order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(v) => vec![v.as_str()],
            Self::Multiple(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    /// Append `value`, promoting a single value to a list.
    fn push(&mut self, value: String) {
        match self {
            Self::Single(existing) => {
                let first = std::mem::take(existing);
                *self = Self::Multiple(vec![first, value]);
            }
            Self::Multiple(vs) => vs.push(value),
        }
    }

    /// Mutable access to the most recent value, used for folded lines.
    fn last_mut(&mut self) -> Option<&mut String> {
        match self {
            Self::Single(v) => Some(v),
            Self::Multiple(vs) => vs.last_mut(),
        }
    }
}

/// Header map of a message.
///
/// Names are kept exactly as written in the source; lookups are case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, HeaderValue>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value for `name`.
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.0.get(name)
    }

    /// First value for `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(HeaderValue::first)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Record a header line. A repeated name accumulates into a list.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        match self.0.entry(name.into()) {
            std::collections::btree_map::Entry::Occupied(mut e) => e.get_mut().push(value),
            std::collections::btree_map::Entry::Vacant(e) => {
                e.insert(HeaderValue::Single(value));
            }
        }
    }

    /// Extend the latest value of `name` with a folded continuation.
    ///
    /// Does nothing if `name` was never recorded.
    pub fn continue_last(&mut self, name: &str, text: &str) {
        if let Some(last) = self.0.get_mut(name).and_then(HeaderValue::last_mut) {
            last.push(' ');
            last.push_str(text);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(name, value)` pairs sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A single-part message: headers and a (possibly transfer-decoded) body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    pub headers: Headers,
    pub body: String,
}

/// A multipart message whose parts are still raw text.
///
/// Each part keeps its own header block. Nothing below the first level is
/// parsed until a caller asks for it through [`MultipartEnvelope::part`] or
/// [`MultipartEnvelope::split_part`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultipartEnvelope {
    pub headers: Headers,
    pub parts: Vec<String>,
}

impl MultipartEnvelope {
    /// Parse part `index` as a message of its own.
    pub fn part(&self, index: usize) -> Option<Result<Message>> {
        self.parts.get(index).map(|raw| mime::parse_message(raw))
    }

    /// Split part `index` into its local header map and body.
    pub fn split_part(&self, index: usize) -> Option<header::Section> {
        self.parts
            .get(index)
            .map(|raw| header::split_headers_body(raw))
    }
}

/// Result of parsing a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Message {
    Single(Envelope),
    Multipart(MultipartEnvelope),
}

impl Message {
    pub fn headers(&self) -> &Headers {
        match self {
            Self::Single(e) => &e.headers,
            Self::Multipart(m) => &m.headers,
        }
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }
}
