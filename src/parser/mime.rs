//! MIME message parsing: header folding, transfer decoding, multipart splitting.

use std::sync::LazyLock;

use base64::{engine::general_purpose, Engine as _};
use regex::Regex;
use tracing::warn;

use crate::error::Result;
use crate::model::message::{Envelope, Headers, Message, MultipartEnvelope};

/// Synthetic header holding the MBOX separator line of a message.
pub const MBOX_FROM_HEADER: &str = "Mbox-From";

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_TRANSFER_ENCODING: &str = "Content-Transfer-Encoding";

const MBOX_SEPARATOR: &str = "From ";

static BOUNDARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"boundary="?([^"\s;]+)"?"#).expect("valid boundary regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    InHeaders,
    InBody,
}

/// Parse a raw message (bytes or text) into a [`Message`].
///
/// Input is read as UTF-8, replacing invalid sequences. The header block
/// ends at the first line that is empty after trimming. A `multipart/*`
/// message with a usable `boundary` parameter yields a
/// [`Message::Multipart`] whose parts are left unparsed; anything else
/// yields a [`Message::Single`].
///
/// A base64 body is decoded and read as UTF-8, replacing invalid
/// sequences. Malformed base64 is kept as-is with a warning.
pub fn parse_message(input: impl AsRef<[u8]>) -> Result<Message> {
    let decoded = String::from_utf8_lossy(input.as_ref());
    let text = decoded.strip_prefix('\u{feff}').unwrap_or(&decoded);

    let mut headers = Headers::new();
    let mut current: Option<String> = None;
    let mut state = State::InHeaders;
    let mut body_lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if state == State::InBody {
            body_lines.push(line);
            continue;
        }

        if line.trim().is_empty() {
            state = State::InBody;
        } else if headers.is_empty() && line.starts_with(MBOX_SEPARATOR) {
            headers.append(MBOX_FROM_HEADER, line[MBOX_SEPARATOR.len()..].trim());
            current = Some(MBOX_FROM_HEADER.to_string());
        } else if line.starts_with([' ', '\t']) {
            if let Some(name) = &current {
                headers.continue_last(name, line.trim());
            }
        } else if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            headers.append(name, value.trim());
            current = Some(name.to_string());
        }
    }

    let body = decode_transfer_encoding(
        headers.first(CONTENT_TRANSFER_ENCODING),
        body_lines.join("\n"),
    );

    let boundary = headers
        .first(CONTENT_TYPE)
        .filter(|ct| ct.starts_with("multipart/"))
        .and_then(extract_boundary);

    match boundary {
        Some(boundary) => {
            let parts = split_multipart(&body, &boundary);
            Ok(Message::Multipart(MultipartEnvelope { headers, parts }))
        }
        None => Ok(Message::Single(Envelope { headers, body })),
    }
}

/// Apply a `Content-Transfer-Encoding` to `body`.
///
/// Only `base64` is decoded (case-insensitive). `quoted-printable` and
/// every other value pass through unchanged.
pub fn decode_transfer_encoding(encoding: Option<&str>, body: String) -> String {
    match encoding.map(|e| e.trim().to_ascii_lowercase()).as_deref() {
        Some("base64") => decode_base64_body(body),
        _ => body,
    }
}

/// Decoded bytes become text lossily, so Latin-1 or binary payloads
/// never fail the parse.
fn decode_base64_body(body: String) -> String {
    let compact: Vec<u8> = body
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    match general_purpose::STANDARD.decode(&compact) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!(error = %e, "Malformed base64 body, keeping it undecoded");
            body
        }
    }
}

/// Extract the `boundary` parameter from a `Content-Type` value.
///
/// Quotes around the value are optional.
pub fn extract_boundary(content_type: &str) -> Option<String> {
    BOUNDARY_RE
        .captures(content_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Split a multipart body on `--boundary`.
///
/// The preamble before the first delimiter and everything from the closing
/// `--boundary--` on are dropped. Each remaining part is trimmed.
pub fn split_multipart(body: &str, boundary: &str) -> Vec<String> {
    let delimiter = format!("--{boundary}");
    let segments: Vec<&str> = body.split(delimiter.as_str()).collect();

    if segments.len() < 3 {
        return Vec::new();
    }
    segments[1..segments.len() - 1]
        .iter()
        .map(|s| s.trim().to_string())
        .collect()
}
