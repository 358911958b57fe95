//! Header/body splitting for messages and multipart sections.
//!
//! This is the flat splitter used on part text: no folding, no duplicate
//! accumulation. Full header handling lives in [`crate::parser::mime`].

use std::collections::HashMap;

/// A block of text separated into its local headers and body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    /// Header map, last value wins for a repeated name.
    pub headers: HashMap<String, String>,
    /// Everything after the first empty line, joined with `\n`.
    pub body: String,
}

impl Section {
    /// Header value by exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Split `text` at its first empty line.
///
/// Lines end in `\n` or `\r\n`. A trailing terminator leaves an empty last
/// line, so `"A: 1\n"` is a header block with an empty body. A line holding
/// only spaces does not count as the separator. Without any empty line the
/// whole input becomes the body and the header map stays empty.
pub fn split_headers_body(text: &str) -> Section {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    let Some(separator) = lines.iter().position(|line| line.is_empty()) else {
        return Section {
            headers: HashMap::new(),
            body: lines.join("\n"),
        };
    };

    let mut headers = HashMap::new();
    for line in &lines[..separator] {
        // Lines without a colon are silently skipped
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_string(), value.trim().to_string());
        }
    }

    Section {
        headers,
        body: lines[separator + 1..].join("\n"),
    }
}
