//! Unit tests for the singer-core crate.

use serde_json::{json, Map, Value};

use crate::{
    read_messages, Catalog, CatalogEntry, Config, DocumentInput, InputError, JsonLinesWriter,
    Message, MessageCollector, MessageError, MessageWriter, State,
};

fn record(stream: &str, body: Value) -> Message {
    let Value::Object(record) = body else {
        panic!("record body must be an object");
    };
    Message::Record {
        stream: stream.to_string(),
        record,
        time_extracted: None,
    }
}

// ============================================================================
// Message Tests
// ============================================================================

#[test]
fn test_record_message_wire_format() {
    let message = record("users", json!({"id": 1, "name": "Ada"}));
    let line = serde_json::to_string(&message).unwrap();

    let parsed: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(parsed["type"], "RECORD");
    assert_eq!(parsed["stream"], "users");
    assert_eq!(parsed["record"]["name"], "Ada");
    // Absent timestamp is omitted from the wire, not serialized as null
    assert!(parsed.get("time_extracted").is_none());
}

#[test]
fn test_message_roundtrip() {
    let messages = vec![
        Message::Schema {
            stream: "users".to_string(),
            schema: json!({"type": "object"}),
            key_properties: vec!["id".to_string()],
        },
        record("users", json!({"id": 1})),
        Message::State {
            value: json!({"bookmarks": {"users": {"rows_synced": 1}}}),
        },
    ];

    for message in messages {
        let line = serde_json::to_string(&message).unwrap();
        let parsed: Message = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, message);
    }
}

#[test]
fn test_message_stream_name() {
    assert_eq!(record("users", json!({})).stream_name(), Some("users"));
    assert_eq!(
        Message::State { value: json!({}) }.stream_name(),
        None
    );
}

#[test]
fn test_json_lines_writer_one_document_per_line() {
    let mut writer = JsonLinesWriter::new(Vec::new());
    writer.write_message(&record("users", json!({"id": 1}))).unwrap();
    writer.write_message(&record("users", json!({"id": 2}))).unwrap();

    let output = String::from_utf8(writer.into_inner()).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        let _: Message = serde_json::from_str(line).unwrap();
    }
}

#[test]
fn test_read_messages_skips_blank_lines() {
    let input = concat!(
        "{\"type\": \"SCHEMA\", \"stream\": \"users\", \"schema\": {}}\n",
        "\n",
        "   \n",
        "{\"type\": \"RECORD\", \"stream\": \"users\", \"record\": {\"id\": 1}}\n",
    );

    let messages = read_messages(input.as_bytes()).unwrap();
    assert_eq!(messages.len(), 2);
}

#[test]
fn test_read_messages_reports_line_number() {
    let input = "{\"type\": \"STATE\", \"value\": {}}\nnot json\n";

    let err = read_messages(input.as_bytes()).unwrap_err();
    match err {
        MessageError::Parse { line, .. } => assert_eq!(line, 2),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_collector_groups_records_by_stream() {
    let mut collector = MessageCollector::default();
    collector.write_message(&record("users", json!({"id": 1}))).unwrap();
    collector.write_message(&record("orders", json!({"id": 10}))).unwrap();
    collector.write_message(&record("users", json!({"id": 2}))).unwrap();

    let grouped = collector.records_by_stream();
    assert_eq!(grouped["users"].len(), 2);
    assert_eq!(grouped["orders"].len(), 1);
    assert_eq!(collector.records_for("users")[1]["id"], json!(2));
    assert!(collector.records_for("missing").is_empty());
}

// ============================================================================
// Catalog Tests
// ============================================================================

#[test]
fn test_catalog_roundtrip() {
    let catalog = Catalog {
        streams: vec![
            CatalogEntry {
                tap_stream_id: "users".to_string(),
                stream: Some("users".to_string()),
                schema: json!({"type": "object"}),
                key_properties: vec!["id".to_string()],
                replication_key: Some("updated_at".to_string()),
            },
            CatalogEntry::new("orders", json!({"type": "object"})),
        ],
    };

    let text = catalog.to_json_pretty().unwrap();
    let reloaded = Catalog::from_json(&text).unwrap();
    assert_eq!(reloaded, catalog);
    assert_eq!(reloaded.stream_ids(), vec!["users", "orders"]);
}

#[test]
fn test_catalog_parses_minimal_entries() {
    let catalog = Catalog::from_value(json!({
        "streams": [
            {"tap_stream_id": "users", "schema": {"type": "object"}}
        ]
    }))
    .unwrap();

    assert_eq!(catalog.streams.len(), 1);
    assert_eq!(catalog.streams[0].display_name(), "users");
    assert!(catalog.streams[0].key_properties.is_empty());
}

#[test]
fn test_catalog_rejects_malformed_document() {
    let result = Catalog::from_value(json!({"streams": [{"schema": {}}]}));
    assert!(result.is_err());
}

// ============================================================================
// State Tests
// ============================================================================

#[test]
fn test_state_bookmarks() {
    let mut state = State::new();
    assert!(state.bookmark("users").is_none());

    state.set_bookmark("users", json!({"rows_synced": 3}));
    state.set_bookmark("orders", json!({"rows_synced": 1}));

    assert_eq!(state.bookmark("users").unwrap()["rows_synced"], json!(3));
    assert_eq!(state.bookmark("orders").unwrap()["rows_synced"], json!(1));
}

#[test]
fn test_state_serde_roundtrip() {
    let mut state = State::new();
    state.insert("currently_syncing", json!("users"));
    state.set_bookmark("users", json!({"cursor": "abc"}));

    let value = state.to_value();
    let reloaded: State = serde_json::from_value(value).unwrap();
    assert_eq!(reloaded, state);
}

// ============================================================================
// Input Tests
// ============================================================================

#[test]
fn test_document_input_inline() {
    let input = DocumentInput::from_cli_arg("{\"api_key\": \"secret\"}").unwrap();
    let value = input.resolve().unwrap();
    assert_eq!(value["api_key"], "secret");
}

#[test]
fn test_document_input_invalid_inline() {
    let result = DocumentInput::from_cli_arg("{not json");
    assert!(result.is_err());
}

#[test]
fn test_document_input_from_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{\"api_key\": \"from-file\"}").unwrap();

    let input = DocumentInput::from_cli_arg(path.to_str().unwrap()).unwrap();
    let value = input.resolve().unwrap();
    assert_eq!(value["api_key"], "from-file");
}

#[test]
fn test_document_input_missing_file() {
    let input = DocumentInput::Path("/nonexistent/config.json".into());
    let err = input.resolve().unwrap_err();
    assert!(matches!(err, InputError::Io { .. }));
}

#[test]
fn test_config_typed_accessors() {
    let config = Config::from_value(json!({
        "host": "localhost",
        "verify_tls": false,
        "page_size": 250
    }))
    .unwrap();

    assert_eq!(config.get_str("host"), Some("localhost"));
    assert_eq!(config.get_bool("verify_tls"), Some(false));
    assert_eq!(config.get_i64("page_size"), Some(250));
    assert!(config.get("missing").is_none());
}

#[test]
fn test_config_rejects_non_object() {
    let err = Config::from_value(json!([1, 2, 3])).unwrap_err();
    assert!(err.to_string().contains("an array"));

    let empty = Config::from_value(Value::Object(Map::new())).unwrap();
    assert!(empty.is_empty());
}
