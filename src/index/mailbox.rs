//! Random access to the messages of an MBOX file by 1-based ordinal.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::{debug, info};

use crate::error::{MboxError, Result};
use crate::model::toc::TocEntry;
use crate::parser::mbox::{self, MboxScanner, DEFAULT_READ_BUFFER_SIZE};

/// Table of contents over an MBOX file.
///
/// The file is scanned once, on the first call that needs the table
/// ([`len`](Self::len), [`message`](Self::message), iteration...). The table
/// is then fixed for the lifetime of the index: later changes to the file
/// are not detected. Every read opens the file on its own; no handle is
/// held between calls.
///
/// Sharing an index between threads is safe. Concurrent first calls may
/// each scan the file, but only one table is ever stored.
#[derive(Debug)]
pub struct MailboxIndex {
    path: PathBuf,
    read_buffer_size: usize,
    toc: OnceLock<Vec<TocEntry>>,
}

impl MailboxIndex {
    /// Create an index for `path` without scanning it yet.
    ///
    /// The path is made absolute. Fails if the file does not exist.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path = std::path::absolute(path).map_err(|e| MboxError::io(path, e))?;
        if !path.exists() {
            return Err(MboxError::FileNotFound(path));
        }
        Ok(Self {
            path,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            toc: OnceLock::new(),
        })
    }

    /// Create an index and scan the file right away.
    pub fn open_eager(path: impl AsRef<Path>) -> Result<Self> {
        let index = Self::new(path)?;
        index.toc()?;
        Ok(index)
    }

    /// Set the buffer size used when scanning the file.
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Absolute path of the MBOX file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the table of contents has been built.
    pub fn is_built(&self) -> bool {
        self.toc.get().is_some()
    }

    /// The table of contents; entry `k - 1` describes ordinal `k`.
    pub fn toc(&self) -> Result<&[TocEntry]> {
        self.build_with_progress(None)
    }

    /// Build the table of contents, reporting `(bytes_read, file_size)`.
    ///
    /// Returns the existing table without rescanning if it is already built.
    pub fn build_with_progress(
        &self,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<&[TocEntry]> {
        if let Some(toc) = self.toc.get() {
            return Ok(toc);
        }

        info!(path = %self.path.display(), "Building table of contents");
        let entries = MboxScanner::new(&self.path)?
            .with_buffer_size(self.read_buffer_size)
            .scan(progress)?;
        debug!(count = entries.len(), "Table of contents built");

        Ok(self.toc.get_or_init(|| entries))
    }

    /// Number of messages in the file.
    pub fn len(&self) -> Result<usize> {
        Ok(self.toc()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Byte range of message `ordinal`, without reading it.
    pub fn entry(&self, ordinal: usize) -> Result<TocEntry> {
        let toc = self.toc()?;
        ordinal
            .checked_sub(1)
            .and_then(|i| toc.get(i))
            .copied()
            .ok_or(MboxError::MessageNotFound(ordinal))
    }

    /// Raw bytes of message `ordinal` (1-based), `From ` line included.
    pub fn message(&self, ordinal: usize) -> Result<Vec<u8>> {
        let entry = self.entry(ordinal)?;
        debug!(
            ordinal,
            offset = entry.offset,
            length = entry.length,
            "Reading message from MBOX"
        );
        mbox::read_message_at(&self.path, entry.offset, entry.length)
    }

    /// Iterate over every message in order.
    pub fn iter(&self) -> Result<Messages<'_>> {
        let count = self.len()?;
        Ok(Messages {
            index: self,
            next: 1,
            last: count,
        })
    }

    /// Iterate over messages `start..=end`.
    ///
    /// Fails if either end lies outside `[1, len]` or `start > end`.
    pub fn range(&self, ordinals: RangeInclusive<usize>) -> Result<Messages<'_>> {
        let (start, end) = ordinals.into_inner();
        let count = self.len()?;
        if start < 1 || end > count || start > end {
            return Err(MboxError::OutOfBounds { start, end, count });
        }
        Ok(Messages {
            index: self,
            next: start,
            last: end,
        })
    }
}

/// Cursor over consecutive messages of a [`MailboxIndex`].
///
/// Each step reads its message through [`MailboxIndex::message`].
#[derive(Debug, Clone)]
pub struct Messages<'a> {
    index: &'a MailboxIndex,
    next: usize,
    last: usize,
}

impl Messages<'_> {
    /// Ordinal the next call to `next()` will read.
    pub fn position(&self) -> usize {
        self.next
    }
}

impl Iterator for Messages<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.last {
            return None;
        }
        let ordinal = self.next;
        self.next += 1;
        Some(self.index.message(ordinal))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.last + 1).saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Messages<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    const TWO_MESSAGES: &str = "From a@b 1 Jan 1970\n\
                                Subject: first\n\
                                \n\
                                one\n\
                                \n\
                                From a@b 1 Jan 1970\n\
                                Subject: second\n\
                                \n\
                                two\n";

    fn mailbox(content: &str) -> (assert_fs::TempDir, MailboxIndex) {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("test.mbox");
        file.write_str(content).unwrap();
        let index = MailboxIndex::new(file.path()).unwrap();
        (dir, index)
    }

    #[test]
    fn test_lazy_build() {
        let (_dir, index) = mailbox(TWO_MESSAGES);
        assert!(!index.is_built());
        assert_eq!(index.len().unwrap(), 2);
        assert!(index.is_built());
    }

    #[test]
    fn test_message_by_ordinal() {
        let (_dir, index) = mailbox(TWO_MESSAGES);
        let first = index.message(1).unwrap();
        assert!(first.starts_with(b"From a@b"));
        assert!(String::from_utf8_lossy(&first).contains("Subject: first"));
        let second = String::from_utf8(index.message(2).unwrap()).unwrap();
        assert_eq!(second, "From a@b 1 Jan 1970\nSubject: second\n\ntwo\n");
    }

    #[test]
    fn test_not_found() {
        let (_dir, index) = mailbox(TWO_MESSAGES);
        for ordinal in [0, 3, 100] {
            assert!(matches!(
                index.message(ordinal),
                Err(MboxError::MessageNotFound(n)) if n == ordinal
            ));
        }
    }

    #[test]
    fn test_iter_matches_indexed_access() {
        let (_dir, index) = mailbox(TWO_MESSAGES);
        let iter = index.iter().unwrap();
        assert_eq!(iter.len(), 2);
        for (i, msg) in iter.enumerate() {
            assert_eq!(msg.unwrap(), index.message(i + 1).unwrap());
        }
    }

    #[test]
    fn test_range_bounds() {
        let (_dir, index) = mailbox(TWO_MESSAGES);
        assert_eq!(index.range(2..=2).unwrap().count(), 1);
        assert_eq!(index.range(1..=2).unwrap().count(), 2);
        for bad in [0..=1, 1..=3, 2..=1] {
            assert!(matches!(
                index.range(bad),
                Err(MboxError::OutOfBounds { count: 2, .. })
            ));
        }
    }

    #[test]
    fn test_empty_file() {
        let (_dir, index) = mailbox("");
        assert!(index.is_empty().unwrap());
        assert_eq!(index.iter().unwrap().count(), 0);
        assert!(index.message(1).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            MailboxIndex::new("/definitely/not/here.mbox"),
            Err(MboxError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_toc_is_not_rebuilt_after_file_change() {
        let (dir, index) = mailbox(TWO_MESSAGES);
        assert_eq!(index.len().unwrap(), 2);
        dir.child("test.mbox")
            .write_str(&format!("{TWO_MESSAGES}\nFrom c@d 1 Jan 1970\n\nthree\n"))
            .unwrap();
        assert_eq!(index.len().unwrap(), 2);
    }

    #[test]
    fn test_path_is_absolute() {
        let (_dir, index) = mailbox(TWO_MESSAGES);
        assert!(index.path().is_absolute());
    }
}
