//! Tests for stream registry construction and sync orchestration.

use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use serde_json::{json, Value};
use singer_kit::testing::samples::{SampleTap, StaticStream};
use singer_kit::{
    DocumentInput, MessageCollector, MessageWriter, PluginContext, Stream, Tap, TapConnector,
};

async fn sample_tap() -> Tap {
    Tap::new(Arc::new(SampleTap), None, None, None)
        .await
        .expect("sample tap construction")
}

#[tokio::test]
async fn discovery_preserves_stream_order() {
    let tap = sample_tap().await;
    assert_eq!(tap.stream_names(), vec!["users", "orders"]);

    let output = tap.run_discovery().unwrap();
    assert!(output.contains("\"users\""));
    assert!(output.contains("\"orders\""));
}

#[tokio::test]
async fn duplicate_catalog_entries_resolve_to_the_last() {
    let catalog = json!({
        "streams": [
            {"tap_stream_id": "users", "schema": {"type": "object", "marker": "first"}},
            {"tap_stream_id": "orders", "schema": {"type": "object"}},
            {"tap_stream_id": "users", "schema": {"type": "object", "marker": "second"}}
        ]
    });

    let tap = Tap::new(
        Arc::new(SampleTap),
        None,
        Some(DocumentInput::Inline(catalog)),
        None,
    )
    .await
    .unwrap();

    // Two entries, first-insertion order, "users" rehydrated from the
    // last matching catalog entry
    assert_eq!(tap.stream_names(), vec!["users", "orders"]);
    let users = tap.get_stream("users").unwrap();
    assert_eq!(users.schema()["marker"], "second");
}

#[tokio::test]
async fn catalog_round_trip_rebuilds_an_equivalent_registry() {
    let discovered = sample_tap().await;
    let catalog_json = discovered.catalog().to_json_pretty().unwrap();

    let reloaded = Tap::new(
        Arc::new(SampleTap),
        None,
        Some(DocumentInput::Inline(
            serde_json::from_str(&catalog_json).unwrap(),
        )),
        None,
    )
    .await
    .unwrap();

    assert_eq!(reloaded.stream_names(), discovered.stream_names());
}

#[tokio::test]
async fn sync_one_unknown_name_lists_known_streams() {
    let mut tap = sample_tap().await;
    let mut out = MessageCollector::default();

    let err = tap.sync_one_with("missing", &mut out).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("missing"));
    assert!(message.contains("orders"));
    assert!(message.contains("users"));
    assert!(out.messages.is_empty());
}

#[tokio::test]
async fn sync_one_drives_only_the_named_stream() {
    let mut tap = sample_tap().await;
    let mut out = MessageCollector::default();

    tap.sync_one_with("users", &mut out).await.unwrap();
    assert_eq!(out.records_for("users").len(), 3);
    assert!(out.records_for("orders").is_empty());
}

#[tokio::test]
async fn sync_all_emits_every_stream_in_order() {
    let mut tap = sample_tap().await;
    let mut out = MessageCollector::default();

    tap.sync_all_with(&mut out).await.unwrap();
    assert_eq!(out.records_for("users").len(), 3);
    assert_eq!(out.records_for("orders").len(), 2);

    // SCHEMA for users precedes every orders message
    let first_orders = out
        .messages
        .iter()
        .position(|m| m.stream_name() == Some("orders"))
        .unwrap();
    let last_users = out
        .messages
        .iter()
        .rposition(|m| m.stream_name() == Some("users"))
        .unwrap();
    assert!(last_users < first_orders);
}

#[tokio::test]
async fn sync_writes_stream_bookmarks() {
    let mut tap = sample_tap().await;
    let mut out = MessageCollector::default();
    tap.sync_all_with(&mut out).await.unwrap();

    let state = tap.state();
    let state = state.lock().unwrap();
    assert_eq!(state.bookmark("users").unwrap()["rows_synced"], json!(3));
    assert_eq!(state.bookmark("orders").unwrap()["rows_synced"], json!(2));
}

#[tokio::test]
async fn config_and_state_inputs_reach_the_tap() {
    let tap = Tap::new(
        Arc::new(SampleTap),
        Some(DocumentInput::Inline(json!({"api_key": "secret"}))),
        None,
        Some(DocumentInput::Inline(
            json!({"bookmarks": {"users": {"rows_synced": 1}}}),
        )),
    )
    .await
    .unwrap();

    assert_eq!(tap.config().get_str("api_key"), Some("secret"));
    let state = tap.state();
    let state = state.lock().unwrap();
    assert_eq!(state.bookmark("users").unwrap()["rows_synced"], json!(1));
}

/// Stream whose sync always fails.
struct BrokenStream;

#[async_trait]
impl Stream for BrokenStream {
    fn name(&self) -> &str {
        "broken"
    }

    fn schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn sync(&mut self, _out: &mut dyn MessageWriter) -> anyhow::Result<()> {
        bail!("source went away")
    }
}

/// Tap whose first stream fails, to observe the abort policy.
struct BrokenFirstTap;

#[async_trait]
impl TapConnector for BrokenFirstTap {
    fn name(&self) -> &str {
        "tap-broken-first"
    }

    async fn discover_streams(
        &self,
        cx: &PluginContext,
    ) -> anyhow::Result<Vec<Box<dyn Stream>>> {
        Ok(vec![
            Box::new(BrokenStream),
            Box::new(StaticStream::users(cx.state.clone())),
        ])
    }
}

#[tokio::test]
async fn sync_all_halts_at_the_first_failure() {
    let mut tap = Tap::new(Arc::new(BrokenFirstTap), None, None, None)
        .await
        .unwrap();
    let mut out = MessageCollector::default();

    let err = tap.sync_all_with(&mut out).await.unwrap_err();
    assert!(err.to_string().contains("broken"));
    // The failure aborts the remaining streams entirely
    assert!(out.records_for("users").is_empty());
}

/// Connector with neither builders nor discovery.
struct BareConnector;

#[async_trait]
impl TapConnector for BareConnector {
    fn name(&self) -> &str {
        "tap-bare"
    }
}

#[tokio::test]
async fn missing_discovery_is_a_hard_failure() {
    let err = Tap::new(Arc::new(BareConnector), None, None, None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("does not support discovery"));
}

#[tokio::test]
async fn catalog_entry_without_builder_fails_construction() {
    let catalog = json!({
        "streams": [{"tap_stream_id": "users", "schema": {"type": "object"}}]
    });

    let err = Tap::new(
        Arc::new(BareConnector),
        None,
        Some(DocumentInput::Inline(catalog)),
        None,
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("no stream implementation"));
}
