//! Catalog documents.
//!
//! A catalog is an ordered list of stream entries, each naming a stream
//! id and its schema. It is both an input (catalog-loaded construction)
//! and an output (discovery result); an entry must survive a
//! discovery-then-reload round trip unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stream entry in a catalog document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Unique stream identifier; keys the stream registry.
    pub tap_stream_id: String,

    /// Display name, when it differs from the id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,

    /// JSON Schema of the stream's records.
    pub schema: Value,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_properties: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,
}

impl CatalogEntry {
    pub fn new(tap_stream_id: impl Into<String>, schema: Value) -> Self {
        Self {
            tap_stream_id: tap_stream_id.into(),
            stream: None,
            schema,
            key_properties: Vec::new(),
            replication_key: None,
        }
    }

    /// Display name, falling back to the stream id.
    pub fn display_name(&self) -> &str {
        self.stream.as_deref().unwrap_or(&self.tap_stream_id)
    }
}

/// An ordered catalog of stream entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub streams: Vec<CatalogEntry>,
}

/// Errors decoding or encoding catalog documents.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Error converting to or from JSON
    #[error("invalid catalog document: {0}")]
    Json(#[from] serde_json::Error),
}

impl Catalog {
    pub fn from_value(value: Value) -> Result<Self, CatalogError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_value(&self) -> Result<Value, CatalogError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Pretty-printed catalog JSON, the machine-readable discovery output.
    pub fn to_json_pretty(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Stream ids in catalog order.
    pub fn stream_ids(&self) -> Vec<&str> {
        self.streams
            .iter()
            .map(|entry| entry.tap_stream_id.as_str())
            .collect()
    }
}
