//! The stream contract.
//!
//! A stream is the unit of extraction: it owns a name and a schema, and
//! its `sync` emits wire messages through whatever writer the
//! orchestrator hands it. Incremental position is the stream's own
//! business, recorded in the shared state under its bookmark.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use singer_core::{CatalogEntry, Message, MessageError, MessageWriter};

/// A single extractable stream of records.
#[async_trait]
pub trait Stream: Send + Sync {
    /// Unique stream name; keys the registry.
    fn name(&self) -> &str;

    /// JSON Schema of this stream's records.
    fn schema(&self) -> Value;

    fn key_properties(&self) -> Vec<String> {
        Vec::new()
    }

    fn replication_key(&self) -> Option<String> {
        None
    }

    /// The catalog entry describing this stream.
    fn catalog_entry(&self) -> CatalogEntry {
        CatalogEntry {
            tap_stream_id: self.name().to_string(),
            stream: Some(self.name().to_string()),
            schema: self.schema(),
            key_properties: self.key_properties(),
            replication_key: self.replication_key(),
        }
    }

    /// Extract this stream: emit a SCHEMA message followed by RECORD
    /// messages, updating the stream's own bookmark as it goes.
    ///
    /// Retry and backoff for flaky sources belong in implementations of
    /// this method, not in the orchestrator above it.
    async fn sync(&mut self, out: &mut dyn MessageWriter) -> anyhow::Result<()>;

    /// Emit this stream's SCHEMA message.
    fn write_schema(&self, out: &mut dyn MessageWriter) -> Result<(), MessageError> {
        out.write_message(&Message::Schema {
            stream: self.name().to_string(),
            schema: self.schema(),
            key_properties: self.key_properties(),
        })
    }

    /// Emit one RECORD message, stamped with the extraction time.
    fn write_record(
        &self,
        out: &mut dyn MessageWriter,
        record: Map<String, Value>,
    ) -> Result<(), MessageError> {
        out.write_message(&Message::Record {
            stream: self.name().to_string(),
            record,
            time_extracted: Some(Utc::now()),
        })
    }
}
