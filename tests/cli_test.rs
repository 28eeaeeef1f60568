//! Tests for the shared connector CLI.

use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use singer_kit::cli::{run_tap_with_args, run_target_with_args, TapArgs, TargetArgs};
use singer_kit::testing::samples::{CollectingTarget, RowSink, SampleTap};

#[test]
fn tap_args_parse_the_documented_flags() {
    let args = TapArgs::try_parse_from([
        "tap-sample",
        "--discover",
        "--config",
        "{\"api_key\": \"secret\"}",
        "--state",
        "state.json",
    ])
    .unwrap();

    assert!(args.discover);
    assert!(!args.version);
    assert_eq!(args.config.as_deref(), Some("{\"api_key\": \"secret\"}"));
    assert_eq!(args.state.as_deref(), Some("state.json"));
    assert!(args.catalog.is_none());
}

#[test]
fn target_args_parse_the_documented_flags() {
    let args =
        TargetArgs::try_parse_from(["target-sample", "--input", "messages.singer"]).unwrap();
    assert_eq!(
        args.input.as_deref(),
        Some(std::path::Path::new("messages.singer"))
    );
    assert!(args.config.is_none());
}

#[tokio::test]
async fn version_flag_short_circuits() {
    let args = TapArgs::try_parse_from(["tap-sample", "--version"]).unwrap();
    run_tap_with_args(Arc::new(SampleTap), args).await.unwrap();
}

#[tokio::test]
async fn discover_flag_runs_discovery() {
    let args = TapArgs::try_parse_from(["tap-sample", "--discover"]).unwrap();
    run_tap_with_args(Arc::new(SampleTap), args).await.unwrap();
}

#[tokio::test]
async fn no_flags_run_a_full_sync() {
    let args = TapArgs::try_parse_from([
        "tap-sample",
        "--config",
        "{\"api_key\": \"secret\"}",
    ])
    .unwrap();
    run_tap_with_args(Arc::new(SampleTap), args).await.unwrap();
}

#[tokio::test]
async fn catalog_flag_routes_to_catalog_loaded_construction() {
    let catalog = json!({
        "streams": [{"tap_stream_id": "users", "schema": {"type": "object"}}]
    })
    .to_string();
    let args =
        TapArgs::try_parse_from(["tap-sample", "--catalog", catalog.as_str()]).unwrap();
    run_tap_with_args(Arc::new(SampleTap), args).await.unwrap();
}

#[tokio::test]
async fn malformed_inline_config_is_rejected() {
    let args = TapArgs::try_parse_from(["tap-sample", "--config", "{not json"]).unwrap();
    let err = run_tap_with_args(Arc::new(SampleTap), args)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("inline JSON"));
}

#[tokio::test]
async fn target_cli_replays_an_input_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let input = dir.path().join("messages.singer");
    std::fs::write(
        &input,
        concat!(
            "{\"type\": \"SCHEMA\", \"stream\": \"users\", \"schema\": {\"type\": \"object\"}}\n",
            "{\"type\": \"RECORD\", \"stream\": \"users\", \"record\": {\"id\": 1}}\n",
        ),
    )
    .unwrap();

    let sink = RowSink::new();
    let target_sink = sink.clone();
    let args = TargetArgs::try_parse_from([
        "target-sample",
        "--input",
        input.to_str().unwrap(),
    ])
    .unwrap();

    run_target_with_args(Box::new(CollectingTarget::new(target_sink)), args)
        .await
        .unwrap();
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn target_version_flag_short_circuits() {
    let sink = RowSink::new();
    let args = TargetArgs::try_parse_from(["target-sample", "--version"]).unwrap();
    run_target_with_args(Box::new(CollectingTarget::new(sink.clone())), args)
        .await
        .unwrap();
    assert!(sink.is_empty());
}
