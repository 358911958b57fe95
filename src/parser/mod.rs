//! Parsing: MBOX scanning, header/body splitting, and MIME handling.

pub mod header;
pub mod mbox;
pub mod mime;
