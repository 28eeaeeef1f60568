//! The line-delimited wire protocol.
//!
//! Taps and targets exchange a stream of JSON documents, one per line,
//! tagged with a `type` field. Only the three message kinds the
//! orchestration core needs are modeled here; interpretation of record
//! contents is left to the plugins on either side.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single wire message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// One extracted record for a named stream.
    #[serde(rename = "RECORD")]
    Record {
        stream: String,
        record: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_extracted: Option<DateTime<Utc>>,
    },

    /// The JSON Schema describing a stream's records.
    #[serde(rename = "SCHEMA")]
    Schema {
        stream: String,
        schema: Value,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        key_properties: Vec<String>,
    },

    /// A checkpoint of incremental-sync position.
    #[serde(rename = "STATE")]
    State { value: Value },
}

impl Message {
    /// The stream this message belongs to, if any (STATE messages have none).
    pub fn stream_name(&self) -> Option<&str> {
        match self {
            Message::Record { stream, .. } | Message::Schema { stream, .. } => Some(stream),
            Message::State { .. } => None,
        }
    }
}

/// Errors reading or writing wire messages.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// Error encoding a message to JSON
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// Error parsing a message line
    #[error("invalid message at line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Error on the underlying reader/writer
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Sink for wire messages.
///
/// Production plugins write to stdout via [`JsonLinesWriter`]; the test
/// harness captures into a [`MessageCollector`] instead.
pub trait MessageWriter: Send {
    fn write_message(&mut self, message: &Message) -> Result<(), MessageError>;
}

/// Writes messages as compact JSON, one document per line.
pub struct JsonLinesWriter<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl JsonLinesWriter<std::io::Stdout> {
    /// Writer on the process's standard output channel.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> MessageWriter for JsonLinesWriter<W> {
    fn write_message(&mut self, message: &Message) -> Result<(), MessageError> {
        let line = serde_json::to_string(message).map_err(MessageError::Encode)?;
        writeln!(self.out, "{line}")?;
        Ok(())
    }
}

/// In-memory message capture.
#[derive(Debug, Default)]
pub struct MessageCollector {
    pub messages: Vec<Message>,
}

impl MessageCollector {
    /// Captured records for one stream, in emission order.
    pub fn records_for(&self, stream: &str) -> Vec<Map<String, Value>> {
        self.messages
            .iter()
            .filter_map(|message| match message {
                Message::Record {
                    stream: name,
                    record,
                    ..
                } if name == stream => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    /// Captured records grouped by stream name.
    pub fn records_by_stream(&self) -> HashMap<String, Vec<Map<String, Value>>> {
        let mut grouped: HashMap<String, Vec<Map<String, Value>>> = HashMap::new();
        for message in &self.messages {
            if let Message::Record { stream, record, .. } = message {
                grouped.entry(stream.clone()).or_default().push(record.clone());
            }
        }
        grouped
    }
}

impl MessageWriter for MessageCollector {
    fn write_message(&mut self, message: &Message) -> Result<(), MessageError> {
        self.messages.push(message.clone());
        Ok(())
    }
}

/// Parse a line-delimited message stream.
///
/// Blank lines are skipped; a malformed line fails with its 1-based line
/// number so operators can locate the offending document.
pub fn read_messages<R: BufRead>(reader: R) -> Result<Vec<Message>, MessageError> {
    let mut messages = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let message = serde_json::from_str(&line).map_err(|source| MessageError::Parse {
            line: index + 1,
            source,
        })?;
        messages.push(message);
    }
    Ok(messages)
}
