//! MBOX store: reads and parses messages by ordinal with LRU caching.

use std::num::NonZeroUsize;
use std::path::Path;

use lru::LruCache;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;
use crate::extract;
use crate::index::MailboxIndex;
use crate::model::message::Message;
use crate::parser::mime;

/// Default number of parsed messages to keep in the LRU cache.
const DEFAULT_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(50) {
    Some(n) => n,
    None => unreachable!(),
};

/// One row of a mailbox listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListEntry {
    /// 1-based message number.
    pub number: usize,
    pub offset: u64,
    pub length: u64,
    /// `None` when the message could not be read.
    pub subject: Option<String>,
}

/// Reads messages from an MBOX file through a [`MailboxIndex`].
///
/// Keeps an LRU cache of parsed [`Message`] objects so that going back and
/// forth through a mailbox does not re-read and re-parse the same messages.
pub struct MboxStore {
    index: MailboxIndex,
    cache: LruCache<usize, Message>,
}

impl MboxStore {
    /// Open an MBOX file with the default cache size.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::with_index(MailboxIndex::new(path)?, DEFAULT_CACHE_SIZE))
    }

    /// Open an MBOX file using the buffer and cache sizes from `config`.
    pub fn open_with_config(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let index = MailboxIndex::new(path)?
            .with_read_buffer_size(config.performance.read_buffer_size);
        Ok(Self::from_index(index, config))
    }

    /// Wrap an existing index, sizing the cache from `config`.
    pub fn from_index(index: MailboxIndex, config: &Config) -> Self {
        let cache_size =
            NonZeroUsize::new(config.performance.lru_cache_size).unwrap_or(DEFAULT_CACHE_SIZE);
        Self::with_index(index, cache_size)
    }

    /// Wrap an existing index.
    pub fn with_index(index: MailboxIndex, cache_size: NonZeroUsize) -> Self {
        Self {
            index,
            cache: LruCache::new(cache_size),
        }
    }

    /// The underlying index.
    pub fn index(&self) -> &MailboxIndex {
        &self.index
    }

    /// Number of messages in the mailbox.
    pub fn len(&self) -> Result<usize> {
        self.index.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.index.is_empty()
    }

    /// Parsed message `ordinal`. Cached results are returned immediately.
    pub fn message(&mut self, ordinal: usize) -> Result<&Message> {
        let index = &self.index;
        self.cache.try_get_or_insert(ordinal, || {
            debug!(ordinal, "Parsing message (cache miss)");
            mime::parse_message(index.message(ordinal)?)
        })
    }

    /// Plain text of message `ordinal`.
    pub fn text(&mut self, ordinal: usize) -> Result<String> {
        extract::extract_text(self.message(ordinal)?)
    }

    /// Raw bytes of message `ordinal` (not cached).
    pub fn raw(&self, ordinal: usize) -> Result<Vec<u8>> {
        self.index.message(ordinal)
    }

    /// Number, position and subject of every message.
    ///
    /// A message that fails to read is logged and listed without a subject;
    /// only a failure to build the table of contents is returned.
    pub fn listing(&mut self) -> Result<Vec<ListEntry>> {
        let toc = self.index.toc()?.to_vec();
        let mut rows = Vec::with_capacity(toc.len());

        for (i, entry) in toc.into_iter().enumerate() {
            let number = i + 1;
            let subject = match self.message(number) {
                Ok(message) => Some(
                    message
                        .headers()
                        .first("Subject")
                        .unwrap_or_default()
                        .to_string(),
                ),
                Err(e) => {
                    warn!(number, error = %e, "Could not read message, listing it without subject");
                    None
                }
            };
            rows.push(ListEntry {
                number,
                offset: entry.offset,
                length: entry.length,
                subject,
            });
        }

        Ok(rows)
    }

    /// Number of parsed messages currently cached.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
