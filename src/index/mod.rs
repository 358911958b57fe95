//! Offset-based index over an MBOX file.

pub mod mailbox;

pub use mailbox::{MailboxIndex, Messages};
