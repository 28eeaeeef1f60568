//! Test runners: execute a plugin end-to-end against fixture inputs and
//! expose the captured output for inspection.
//!
//! A runner constructs a fresh plugin instance for every run, so a test
//! definition can be exercised repeatedly against different fixtures
//! without leaking registry or state between runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use serde_json::{Map, Value};
use singer_core::{DocumentInput, Message, MessageCollector};

use crate::tap::{Tap, TapConnector};
use crate::target::{Target, TargetConnector};
use crate::testing::config::SuiteConfig;

/// Runs a tap and captures everything it emits.
pub struct TapTestRunner {
    connector: Arc<dyn TapConnector>,
    suite_config: SuiteConfig,
    config: Option<DocumentInput>,
    catalog: Option<DocumentInput>,
    state: Option<DocumentInput>,
    messages: Vec<Message>,
    records: HashMap<String, Vec<Map<String, Value>>>,
}

impl TapTestRunner {
    pub fn new(connector: Arc<dyn TapConnector>) -> Self {
        Self {
            connector,
            suite_config: SuiteConfig::default(),
            config: None,
            catalog: None,
            state: None,
            messages: Vec::new(),
            records: HashMap::new(),
        }
    }

    pub fn with_suite_config(mut self, suite_config: SuiteConfig) -> Self {
        self.suite_config = suite_config;
        self
    }

    pub fn with_config(mut self, config: DocumentInput) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_catalog(mut self, catalog: DocumentInput) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_state(mut self, state: DocumentInput) -> Self {
        self.state = Some(state);
        self
    }

    pub fn suite_config(&self) -> &SuiteConfig {
        &self.suite_config
    }

    /// Construct a fresh tap from the configured inputs.
    pub async fn new_tap(&self) -> anyhow::Result<Tap> {
        Tap::new(
            self.connector.clone(),
            self.config.clone(),
            self.catalog.clone(),
            self.state.clone(),
        )
        .await
    }

    /// Run a full sync through a fresh tap, capturing every message.
    pub async fn sync_all(&mut self) -> anyhow::Result<()> {
        let mut tap = self.new_tap().await?;
        let mut collector = MessageCollector::default();
        tap.sync_all_with(&mut collector).await?;
        self.records = collector.records_by_stream();
        self.messages = collector.messages;
        Ok(())
    }

    /// Every message captured by the last sync, in emission order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Captured records grouped by stream name.
    pub fn records(&self) -> &HashMap<String, Vec<Map<String, Value>>> {
        &self.records
    }

    /// Captured records for one stream, truncated to the suite's
    /// per-stream limit when one is configured.
    pub fn stream_records(&self, stream_name: &str) -> Vec<Map<String, Value>> {
        let mut records = self.records.get(stream_name).cloned().unwrap_or_default();
        if let Some(limit) = self.suite_config.max_records_limit {
            records.truncate(limit);
        }
        records
    }
}

/// Replays an input message file into a target.
pub struct TargetTestRunner {
    factory: Box<dyn Fn() -> Box<dyn TargetConnector> + Send + Sync>,
    config: Option<DocumentInput>,
    fixture_dir: PathBuf,
    input_path: Option<PathBuf>,
}

impl TargetTestRunner {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Box<dyn TargetConnector> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            config: None,
            fixture_dir: PathBuf::from("target_test_streams"),
            input_path: None,
        }
    }

    pub fn with_config(mut self, config: DocumentInput) -> Self {
        self.config = Some(config);
        self
    }

    /// Directory the target-file tests resolve their fixtures from.
    pub fn with_fixture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixture_dir = dir.into();
        self
    }

    pub fn fixture_dir(&self) -> &Path {
        &self.fixture_dir
    }

    pub fn input_path(&self) -> Option<&Path> {
        self.input_path.as_deref()
    }

    /// Set the message file the next sync replays.
    pub fn set_input_path(&mut self, path: PathBuf) {
        self.input_path = Some(path);
    }

    /// Construct a fresh target from the configured inputs.
    pub async fn new_target(&self) -> anyhow::Result<Target> {
        Target::new((self.factory)(), self.config.clone()).await
    }

    /// Replay the configured input file through a fresh target.
    pub async fn sync_all(&mut self) -> anyhow::Result<()> {
        let path = self
            .input_path
            .clone()
            .ok_or_else(|| anyhow!("no input file configured for target runner"))?;
        let mut target = self.new_target().await?;
        target.process_file(&path).await?;
        Ok(())
    }
}
