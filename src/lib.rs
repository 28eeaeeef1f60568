//! singer-kit Library
//!
//! A toolkit for building Singer taps (data extractors) and targets
//! (data loaders) that speak the line-delimited message protocol, plus a
//! conformance-test harness for exercising them.
//!
//! # Features
//!
//! - Catalog-driven stream registry: build streams from a catalog
//!   document or from a tap's own discovery routine
//! - Deterministic synchronization: strictly sequential `sync_all` /
//!   `sync_one` over an insertion-ordered registry
//! - Discovery output: serialize the registry back to catalog JSON for
//!   downstream tools
//! - Conformance harness: a four-phase test lifecycle engine with
//!   tap-, stream-, attribute- and target-level test categories
//!
//! # CLI Usage
//!
//! Concrete connectors mount the shared CLI from their `main`:
//!
//! ```bash
//! # Print name and version
//! tap-sample --version
//!
//! # Run discovery and print the catalog JSON
//! tap-sample --discover
//!
//! # Full sync against a catalog, resuming from checkpoint state
//! tap-sample --config config.json --catalog catalog.json --state state.json
//! ```

pub mod cli;
pub mod stream;
pub mod tap;
pub mod target;
pub mod testing;

// Re-export the protocol types for convenience
pub use singer_core::{
    Catalog, CatalogEntry, Config, DocumentInput, JsonLinesWriter, Message, MessageCollector,
    MessageWriter, SharedState, State,
};

pub use stream::Stream;
pub use tap::{PluginContext, StreamBuilder, Tap, TapConnector};
pub use target::{Target, TargetConnector};
