//! Core data model types: parsed messages and table-of-contents entries.

pub mod message;
pub mod toc;
