//! In-memory sample connectors.
//!
//! Small, deterministic plugins used by the kit's own tests and by the
//! reference binaries: a tap serving fixed `users` and `orders` rows,
//! and a target that collects whatever is replayed into it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use singer_core::{CatalogEntry, Config, Message, MessageWriter, SharedState};

use crate::stream::Stream;
use crate::tap::{PluginContext, StreamBuilder, TapConnector};
use crate::target::TargetConnector;

fn object_rows(rows: Vec<Value>) -> Vec<Map<String, Value>> {
    rows.into_iter()
        .filter_map(|row| match row {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

fn user_rows() -> Vec<Map<String, Value>> {
    object_rows(vec![
        json!({"id": 1, "name": "Ada", "age": 34, "email": null}),
        json!({"id": 2, "name": "Grace", "age": null, "email": null}),
        json!({"id": 3, "name": "Linus", "age": 28, "email": null}),
    ])
}

fn order_rows() -> Vec<Map<String, Value>> {
    object_rows(vec![
        json!({"id": 10, "user_id": 1, "amount": 42.5, "placed_at": "2024-03-01T09:30:00Z"}),
        json!({"id": 11, "user_id": 3, "amount": 7.0, "placed_at": "2024-03-02T16:05:00Z"}),
    ])
}

fn users_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "name": {"type": "string"},
            "age": {"type": ["integer", "null"]},
            "email": {"type": ["string", "null"]}
        }
    })
}

fn orders_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "user_id": {"type": "integer"},
            "amount": {"type": "number"},
            "placed_at": {"type": "string", "format": "date-time"}
        }
    })
}

/// A stream backed by a fixed set of in-memory rows.
pub struct StaticStream {
    name: String,
    schema: Value,
    key_properties: Vec<String>,
    rows: Vec<Map<String, Value>>,
    state: SharedState,
}

impl StaticStream {
    pub fn new(
        name: impl Into<String>,
        schema: Value,
        key_properties: Vec<String>,
        rows: Vec<Map<String, Value>>,
        state: SharedState,
    ) -> Self {
        Self {
            name: name.into(),
            schema,
            key_properties,
            rows,
            state,
        }
    }

    pub fn users(state: SharedState) -> Self {
        Self::new("users", users_schema(), vec!["id".into()], user_rows(), state)
    }

    pub fn orders(state: SharedState) -> Self {
        Self::new(
            "orders",
            orders_schema(),
            vec!["id".into()],
            order_rows(),
            state,
        )
    }

    /// Rehydrate from a catalog entry: known sample streams get their
    /// built-in rows, anything else is empty.
    pub fn from_catalog_entry(entry: &CatalogEntry, cx: &PluginContext) -> Self {
        let rows = match entry.tap_stream_id.as_str() {
            "users" => user_rows(),
            "orders" => order_rows(),
            _ => Vec::new(),
        };
        Self::new(
            entry.tap_stream_id.clone(),
            entry.schema.clone(),
            entry.key_properties.clone(),
            rows,
            cx.state.clone(),
        )
    }
}

#[async_trait]
impl Stream for StaticStream {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> Value {
        self.schema.clone()
    }

    fn key_properties(&self) -> Vec<String> {
        self.key_properties.clone()
    }

    async fn sync(&mut self, out: &mut dyn MessageWriter) -> anyhow::Result<()> {
        self.write_schema(out)?;
        for row in &self.rows {
            self.write_record(out, row.clone())?;
        }

        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("state lock poisoned"))?;
        state.set_bookmark(&self.name, json!({"rows_synced": self.rows.len()}));
        Ok(())
    }
}

/// Tap serving the fixed `users` and `orders` streams.
pub struct SampleTap;

#[async_trait]
impl TapConnector for SampleTap {
    fn name(&self) -> &str {
        "tap-sample"
    }

    fn default_stream_builder(&self) -> Option<StreamBuilder> {
        Some(Box::new(|entry, cx| {
            Ok(Box::new(StaticStream::from_catalog_entry(entry, cx)) as Box<dyn Stream>)
        }))
    }

    async fn discover_streams(
        &self,
        cx: &PluginContext,
    ) -> anyhow::Result<Vec<Box<dyn Stream>>> {
        Ok(vec![
            Box::new(StaticStream::users(cx.state.clone())),
            Box::new(StaticStream::orders(cx.state.clone())),
        ])
    }
}

/// Shared storage behind [`CollectingTarget`] instances.
///
/// The runner constructs a fresh target per run, so assertions go
/// through this handle rather than the consumed target.
#[derive(Clone, Default)]
pub struct RowSink {
    rows: Arc<Mutex<Vec<(String, Map<String, Value>)>>>,
    schemas: Arc<Mutex<HashMap<String, Value>>>,
    finalized: Arc<Mutex<bool>>,
}

impl RowSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loaded rows as (stream, record) pairs, in arrival order.
    pub fn rows(&self) -> Vec<(String, Map<String, Value>)> {
        self.rows.lock().map(|rows| rows.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The last schema seen for a stream, if any.
    pub fn schema_for(&self, stream: &str) -> Option<Value> {
        self.schemas
            .lock()
            .ok()
            .and_then(|schemas| schemas.get(stream).cloned())
    }

    /// Whether the target's end-of-input flush ran.
    pub fn finalized(&self) -> bool {
        self.finalized.lock().map(|flag| *flag).unwrap_or(false)
    }
}

/// Target that collects processed rows into a [`RowSink`].
pub struct CollectingTarget {
    sink: RowSink,
}

impl CollectingTarget {
    pub fn new(sink: RowSink) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl TargetConnector for CollectingTarget {
    fn name(&self) -> &str {
        "target-sample"
    }

    async fn initialize(&mut self, config: &Config) -> anyhow::Result<()> {
        if !config.is_empty() {
            tracing::debug!("target-sample configured with {config:?}");
        }
        Ok(())
    }

    async fn process_message(&mut self, message: Message) -> anyhow::Result<()> {
        match message {
            Message::Record { stream, record, .. } => {
                self.sink
                    .rows
                    .lock()
                    .map_err(|_| anyhow!("row sink lock poisoned"))?
                    .push((stream, record));
            }
            Message::Schema { stream, schema, .. } => {
                self.sink
                    .schemas
                    .lock()
                    .map_err(|_| anyhow!("row sink lock poisoned"))?
                    .insert(stream, schema);
            }
            Message::State { .. } => {}
        }
        Ok(())
    }

    async fn finalize(&mut self) -> anyhow::Result<()> {
        *self
            .sink
            .finalized
            .lock()
            .map_err(|_| anyhow!("row sink lock poisoned"))? = true;
        Ok(())
    }
}
