//! Checkpoint state.
//!
//! State is a free-form JSON object loaded once at plugin construction
//! and handed to every stream. Streams record their incremental position
//! under `bookmarks.<stream name>`; the orchestrator itself never writes
//! to it. Access is serialized by running syncs strictly one at a time.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form checkpoint mapping with per-stream bookmark accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State {
    values: Map<String, Value>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The bookmark recorded for one stream, if any.
    pub fn bookmark(&self, stream: &str) -> Option<&Value> {
        self.values.get("bookmarks")?.get(stream)
    }

    /// Record a stream's bookmark, creating the `bookmarks` object on
    /// first use.
    pub fn set_bookmark(&mut self, stream: &str, value: Value) {
        let bookmarks = self
            .values
            .entry("bookmarks")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = bookmarks {
            map.insert(stream.to_string(), value);
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

/// Handle shared between the orchestrator and its streams.
///
/// Streams are the only writers, and only during their own sync; the
/// strictly sequential sync order is what keeps access single-writer.
pub type SharedState = Arc<Mutex<State>>;

/// Wrap a state document in a shareable handle.
pub fn shared(state: State) -> SharedState {
    Arc::new(Mutex::new(state))
}
