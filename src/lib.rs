//! `mboxtext`: random-access MBOX reading and MIME-to-text extraction.
//!
//! This crate provides a lazily built, offset-based index over MBOX files,
//! a small MIME parser that keeps multipart children unparsed until they
//! are needed, and an extractor that reduces a message to plain text.

pub mod config;
pub mod error;
pub mod extract;
pub mod index;
pub mod model;
pub mod parser;
pub mod store;
