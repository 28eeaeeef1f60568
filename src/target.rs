//! Target orchestration: replay a message stream into a loader.
//!
//! A target consumes the line-delimited protocol from a file or from
//! stdin, dispatching each message to its connector in input order.
//! What "loading" means — tables, files, API calls — is entirely the
//! connector's concern.

use std::io::BufRead;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use singer_core::{read_messages, Config, DocumentInput, Message};

/// Everything a concrete target contributes.
#[async_trait]
pub trait TargetConnector: Send + Sync {
    /// Plugin name, e.g. `target-sample`.
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    /// One-time setup with the resolved configuration.
    async fn initialize(&mut self, config: &Config) -> anyhow::Result<()> {
        let _ = config;
        Ok(())
    }

    /// Handle one wire message. Called strictly in input order.
    async fn process_message(&mut self, message: Message) -> anyhow::Result<()>;

    /// Flush at end of input.
    async fn finalize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A configured target ready to consume a message stream.
pub struct Target {
    connector: Box<dyn TargetConnector>,
    config: Config,
}

impl Target {
    pub async fn new(
        mut connector: Box<dyn TargetConnector>,
        config: Option<DocumentInput>,
    ) -> anyhow::Result<Self> {
        let config = match config {
            Some(input) => Config::from_value(input.resolve()?)?,
            None => Config::default(),
        };
        connector.initialize(&config).await?;
        Ok(Self { connector, config })
    }

    pub fn name(&self) -> &str {
        self.connector.name()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume a line-delimited message stream, then finalize.
    ///
    /// Returns the number of messages processed. Blank lines are
    /// skipped; a malformed line fails with its line number before any
    /// further message is dispatched.
    pub async fn process_lines<R: BufRead>(&mut self, reader: R) -> anyhow::Result<usize> {
        let messages = read_messages(reader)?;
        let count = messages.len();
        for message in messages {
            self.connector.process_message(message).await?;
        }
        self.connector.finalize().await?;
        tracing::info!("target '{}' processed {count} messages", self.name());
        Ok(count)
    }

    /// Replay a message file into the target.
    pub async fn process_file(&mut self, path: &Path) -> anyhow::Result<usize> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open input file {}", path.display()))?;
        self.process_lines(std::io::BufReader::new(file)).await
    }
}
