//! Cached message access on top of the MBOX index.

pub mod reader;
