//! Plain-text extraction from parsed messages.
//!
//! Walks a [`Message`] and turns every readable part into text. Multipart
//! children are split and parsed only as they are visited.

pub mod html;

use tracing::warn;

use crate::error::Result;
use crate::model::message::{Envelope, Message, MultipartEnvelope};
use crate::parser::header::{split_headers_body, Section};
use crate::parser::mime::{
    decode_transfer_encoding, parse_message, CONTENT_TRANSFER_ENCODING, CONTENT_TYPE,
};

pub use html::{html_to_text, sanitize_text};

/// Maximum nesting depth followed when descending into parts.
const MAX_DEPTH: usize = 10;

/// Content type assumed when none is declared (RFC 2045).
const DEFAULT_CONTENT_TYPE: &str = "text/plain";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentKind {
    Html,
    Plain,
    Multipart,
    Other,
}

impl ContentKind {
    fn of(content_type: &str) -> Self {
        let ct = content_type.trim().to_ascii_lowercase();
        if ct.starts_with("text/html") {
            Self::Html
        } else if ct.starts_with("text/plain") {
            Self::Plain
        } else if ct.starts_with("multipart/") {
            Self::Multipart
        } else {
            Self::Other
        }
    }
}

/// Reduce a parsed message to plain text.
///
/// HTML parts go through [`html_to_text`], plain parts through
/// [`sanitize_text`]. Texts from several parts are joined with a blank line.
/// Parts of any other type (attachments, images...) contribute nothing.
pub fn extract_text(message: &Message) -> Result<String> {
    extract_at_depth(message, 0)
}

/// Parse raw message bytes and reduce them to plain text.
pub fn extract_text_from_raw(raw: impl AsRef<[u8]>) -> Result<String> {
    extract_text(&parse_message(raw)?)
}

fn extract_at_depth(message: &Message, depth: usize) -> Result<String> {
    if depth > MAX_DEPTH {
        warn!(depth, "Message nesting too deep, skipping remaining parts");
        return Ok(String::new());
    }
    match message {
        Message::Single(envelope) => extract_envelope(envelope, depth),
        Message::Multipart(multipart) => extract_multipart(multipart, depth),
    }
}

fn extract_envelope(envelope: &Envelope, depth: usize) -> Result<String> {
    // The body may carry a header block of its own (a part re-parsed as a
    // message). Only a block declaring Content-Type counts, so ordinary
    // `Key: value` text is not taken for headers.
    let section = split_headers_body(&envelope.body);
    let (content_type, content) = match section.header(CONTENT_TYPE) {
        Some(nested) => (nested, section.body.as_str()),
        None => (
            envelope
                .headers
                .first(CONTENT_TYPE)
                .unwrap_or(DEFAULT_CONTENT_TYPE),
            envelope.body.as_str(),
        ),
    };

    match ContentKind::of(content_type) {
        ContentKind::Html => Ok(html_to_text(content)),
        ContentKind::Plain => Ok(sanitize_text(content)),
        ContentKind::Multipart | ContentKind::Other => {
            if envelope.body.trim().is_empty() {
                return Ok(String::new());
            }
            let nested = parse_message(&envelope.body)?;
            extract_at_depth(&nested, depth + 1)
        }
    }
}

fn extract_multipart(multipart: &MultipartEnvelope, depth: usize) -> Result<String> {
    let mut texts = Vec::with_capacity(multipart.parts.len());

    for raw in &multipart.parts {
        let section = split_headers_body(raw);
        let content_type = section.header(CONTENT_TYPE).unwrap_or(DEFAULT_CONTENT_TYPE);

        let text = match ContentKind::of(content_type) {
            ContentKind::Html => html_to_text(&decoded_body(&section)),
            ContentKind::Plain => sanitize_text(&decoded_body(&section)),
            ContentKind::Multipart => extract_at_depth(&parse_message(raw)?, depth + 1)?,
            ContentKind::Other => continue,
        };

        if !text.is_empty() {
            texts.push(text);
        }
    }

    Ok(texts.join("\n\n"))
}

/// Part body after its own transfer encoding.
fn decoded_body(section: &Section) -> String {
    let encoding = section.header(CONTENT_TRANSFER_ENCODING);
    decode_transfer_encoding(encoding, section.body.clone())
}
