//! Core types for the singer-kit framework.
//!
//! This crate provides the foundational types shared by taps, targets and
//! the conformance-test harness:
//!
//! - [`Message`] - The line-delimited wire protocol (RECORD/SCHEMA/STATE)
//! - [`Catalog`] / [`CatalogEntry`] - Stream catalog documents
//! - [`State`] - Free-form checkpoint state with per-stream bookmarks
//! - [`Config`] / [`DocumentInput`] - Plugin configuration inputs
//!
//! # Architecture
//!
//! The singer-core crate sits at the foundation of the framework:
//!
//! ```text
//! singer-core (this crate)
//!    │
//!    └─── singer-kit  (tap/target orchestration, CLI, test harness)
//! ```
//!
//! Messages are exchanged one JSON document per line; a tap writes them
//! through a [`MessageWriter`] and a target reads them back with
//! [`read_messages`]. Everything here is plain data — no I/O policy, no
//! retries, no schema inference.

pub mod catalog;
pub mod input;
pub mod messages;
pub mod state;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use catalog::{Catalog, CatalogEntry, CatalogError};
pub use input::{Config, DocumentInput, InputError};
pub use messages::{
    read_messages, JsonLinesWriter, Message, MessageCollector, MessageError, MessageWriter,
};
pub use state::{shared, SharedState, State};
