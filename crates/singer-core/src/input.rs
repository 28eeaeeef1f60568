//! Plugin input documents.
//!
//! Configuration, catalog and state all arrive the same way on the
//! command line: either a path to a JSON file or an inline JSON object.
//! [`DocumentInput`] carries that distinction and resolves to a plain
//! [`serde_json::Value`] on demand.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Errors resolving plugin input documents.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// Error reading an input file
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing an input document
    #[error("failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// Input document has the wrong JSON shape
    #[error("expected a JSON object, got {found}")]
    NotAnObject { found: &'static str },
}

/// A document supplied either inline or as a file reference.
#[derive(Debug, Clone)]
pub enum DocumentInput {
    Inline(Value),
    Path(PathBuf),
}

impl DocumentInput {
    /// Interpret a CLI value: inline JSON when it starts with `{`, a
    /// file path otherwise.
    pub fn from_cli_arg(raw: &str) -> Result<Self, InputError> {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') {
            let value = serde_json::from_str(trimmed).map_err(|source| InputError::Parse {
                what: "inline JSON document".to_string(),
                source,
            })?;
            Ok(Self::Inline(value))
        } else {
            Ok(Self::Path(PathBuf::from(trimmed)))
        }
    }

    /// Load and parse the document.
    pub fn resolve(&self) -> Result<Value, InputError> {
        match self {
            Self::Inline(value) => Ok(value.clone()),
            Self::Path(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| InputError::Io {
                    path: path.clone(),
                    source,
                })?;
                serde_json::from_str(&text).map_err(|source| InputError::Parse {
                    what: path.display().to_string(),
                    source,
                })
            }
        }
    }
}

/// Plugin configuration: a JSON object with typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    values: Map<String, Value>,
}

impl Config {
    pub fn from_value(value: Value) -> Result<Self, InputError> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            other => Err(InputError::NotAnObject {
                found: json_type_name(&other),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key)?.as_str()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key)?.as_bool()
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.values.get(key)?.as_i64()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
