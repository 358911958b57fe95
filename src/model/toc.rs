//! Table-of-contents entries for an indexed MBOX file.

use serde::Serialize;

/// Byte range of one message inside the MBOX file.
///
/// The range starts at the message's `From ` separator line and runs up to
/// the next separator or the end of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    /// Byte offset of the `From ` line.
    pub offset: u64,
    /// Number of bytes up to the next message.
    pub length: u64,
}

impl TocEntry {
    /// Offset one past the last byte of the message.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}
