//! Streaming MBOX scanner.
//!
//! Reads MBOX files line-by-line through a large buffer and records where
//! each message starts and how long it is. Never loads the entire file into
//! memory and never interprets message content.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{MboxError, Result};
use crate::model::toc::TocEntry;

/// Default size of the internal read buffer (1 MB for fast sequential reads).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Progress is reported every 4 MB.
const PROGRESS_INTERVAL: u64 = 4 * 1024 * 1024;

/// Streaming scanner that turns an MBOX file into a table of contents.
///
/// Every line beginning with `From ` opens a new message. The scanner is
/// tolerant of:
///
/// - Mixed `\n` and `\r\n` line endings
/// - `From ` lines not preceded by a blank line (logs a warning)
/// - Text before the first separator (ignored)
/// - NUL bytes and other binary content in the body
/// - UTF-8 BOM at the start of the file
pub struct MboxScanner {
    path: PathBuf,
    file_size: u64,
    buffer_size: usize,
}

impl MboxScanner {
    /// Create a scanner for the given MBOX file.
    ///
    /// Verifies that the file exists and is readable, but does NOT validate
    /// that it is actually an MBOX.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MboxError::FileNotFound(path.clone())
            } else {
                MboxError::io(&path, e)
            }
        })?;
        Ok(Self {
            path,
            file_size: metadata.len(),
            buffer_size: DEFAULT_READ_BUFFER_SIZE,
        })
    }

    /// Override the read buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(4096);
        self
    }

    /// Total size of the underlying file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Path to the MBOX file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scan the whole file and return one [`TocEntry`] per message, in file order.
    ///
    /// `progress_callback` receives `(bytes_read, file_size)`.
    pub fn scan(&self, progress_callback: Option<&dyn Fn(u64, u64)>) -> Result<Vec<TocEntry>> {
        let mut entries = Vec::new();
        if self.file_size == 0 {
            return Ok(entries);
        }

        let file = File::open(&self.path).map_err(|e| MboxError::io(&self.path, e))?;
        let mut reader = BufReader::with_capacity(self.buffer_size, file);

        let mut current_offset: u64 = 0;
        let mut message_start: Option<u64> = None;
        let mut prev_line_was_empty = true;
        let mut first_line = true;
        let mut last_progress: u64 = 0;

        // Reusable line buffer, grows to the longest line seen
        let mut line_buf: Vec<u8> = Vec::with_capacity(4096);

        loop {
            line_buf.clear();
            let line_len = reader
                .read_until(b'\n', &mut line_buf)
                .map_err(|e| MboxError::io(&self.path, e))? as u64;
            if line_len == 0 {
                break; // EOF
            }

            if is_mbox_separator(&line_buf, first_line) {
                if !first_line && !prev_line_was_empty {
                    warn!(
                        offset = current_offset,
                        "Found 'From ' separator without preceding blank line"
                    );
                }
                if let Some(start) = message_start {
                    entries.push(TocEntry {
                        offset: start,
                        length: current_offset - start,
                    });
                }
                message_start = Some(current_offset);
            }

            prev_line_was_empty = is_blank_line(&line_buf);
            first_line = false;
            current_offset += line_len;

            if let Some(cb) = progress_callback {
                if current_offset - last_progress >= PROGRESS_INTERVAL {
                    cb(current_offset, self.file_size);
                    last_progress = current_offset;
                }
            }
        }

        // Close the last message at EOF
        if let Some(start) = message_start {
            entries.push(TocEntry {
                offset: start,
                length: current_offset - start,
            });
        }

        if let Some(cb) = progress_callback {
            cb(current_offset, self.file_size);
        }

        Ok(entries)
    }
}

/// Read `length` bytes starting at `offset`.
///
/// Uses `seek` to jump directly to the message without scanning the file.
pub fn read_message_at(path: impl AsRef<Path>, offset: u64, length: u64) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| MboxError::io(path, e))?;
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| MboxError::io(path, e))?;
    let mut buffer = vec![0u8; length as usize];
    file.read_exact(&mut buffer)
        .map_err(|e| MboxError::io(path, e))?;
    Ok(buffer)
}

/// Check whether a line is an MBOX separator (`From ` at the start).
///
/// A UTF-8 BOM is skipped on the first line of the file only.
fn is_mbox_separator(line: &[u8], first_line: bool) -> bool {
    let line = match line.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        Some(rest) if first_line => rest,
        _ => line,
    };
    line.starts_with(b"From ")
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}
