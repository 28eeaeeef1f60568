//! Tap orchestration: the stream registry and its sync driver.
//!
//! A [`Tap`] is built exactly once from a connector plus optional
//! config, catalog and state inputs. Construction follows one of two
//! mutually exclusive paths:
//!
//! 1. A catalog was supplied: every entry is rehydrated into a stream
//!    through the connector's builder registry (falling back to its
//!    default builder when the tap has a single stream shape).
//! 2. No catalog: the connector's discovery routine must produce the
//!    complete ordered stream set. Discovery is a required capability
//!    on this path; a connector without it fails construction.
//!
//! Once built, the registry is immutable: pick up a different catalog
//! or state by constructing a fresh tap.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use indexmap::IndexMap;
use singer_core::{
    Catalog, CatalogEntry, Config, DocumentInput, JsonLinesWriter, MessageWriter, SharedState,
    State,
};

use crate::stream::Stream;

/// Construction context handed to stream builders and discovery.
#[derive(Clone)]
pub struct PluginContext {
    pub config: Config,
    pub state: SharedState,
}

/// Constructs a stream from its catalog entry.
pub type StreamBuilder =
    Box<dyn Fn(&CatalogEntry, &PluginContext) -> anyhow::Result<Box<dyn Stream>> + Send + Sync>;

/// Everything a concrete tap contributes: identity, stream constructors
/// and (optionally) a discovery routine.
#[async_trait]
pub trait TapConnector: Send + Sync {
    /// Plugin name, e.g. `tap-sample`.
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    /// Stream constructors keyed by `tap_stream_id`, for taps with more
    /// than one stream shape. Consulted once, at construction.
    fn stream_builders(&self) -> HashMap<String, StreamBuilder> {
        HashMap::new()
    }

    /// Fallback constructor for taps that define a single stream shape.
    fn default_stream_builder(&self) -> Option<StreamBuilder> {
        None
    }

    /// Produce the complete ordered stream set when no catalog is
    /// supplied. Sync cannot proceed without it, so the default is a
    /// hard error rather than a tolerated absence.
    async fn discover_streams(
        &self,
        cx: &PluginContext,
    ) -> anyhow::Result<Vec<Box<dyn Stream>>> {
        let _ = cx;
        bail!(
            "tap '{}' does not support discovery; supply --catalog and try again",
            self.name()
        )
    }
}

/// An ordered, name-keyed registry of streams with its sync driver.
pub struct Tap {
    connector: Arc<dyn TapConnector>,
    context: PluginContext,
    streams: IndexMap<String, Box<dyn Stream>>,
}

impl std::fmt::Debug for Tap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tap")
            .field("connector", &self.connector.name())
            .field("streams", &self.streams.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Tap {
    /// Build the stream registry from the given inputs.
    ///
    /// Each input is accepted inline or as a file reference. Duplicate
    /// stream names in a catalog are resolved last-entry-wins, keeping
    /// the position of the first occurrence.
    pub async fn new(
        connector: Arc<dyn TapConnector>,
        config: Option<DocumentInput>,
        catalog: Option<DocumentInput>,
        state: Option<DocumentInput>,
    ) -> anyhow::Result<Self> {
        let config = match config {
            Some(input) => Config::from_value(input.resolve()?)?,
            None => Config::default(),
        };
        let state: State = match state {
            Some(input) => serde_json::from_value(input.resolve()?)
                .context("invalid state document")?,
            None => State::new(),
        };
        let catalog = match catalog {
            Some(input) => Some(Catalog::from_value(input.resolve()?)?),
            None => None,
        };

        let context = PluginContext {
            config,
            state: singer_core::shared(state),
        };

        let list = match catalog {
            Some(catalog) => {
                tracing::info!("loading catalog streams");
                Self::streams_from_catalog(connector.as_ref(), &catalog, &context)?
            }
            None => {
                tracing::info!("discovering catalog streams");
                connector.discover_streams(&context).await?
            }
        };

        let mut streams: IndexMap<String, Box<dyn Stream>> = IndexMap::new();
        for stream in list {
            streams.insert(stream.name().to_string(), stream);
        }

        Ok(Self {
            connector,
            context,
            streams,
        })
    }

    fn streams_from_catalog(
        connector: &dyn TapConnector,
        catalog: &Catalog,
        cx: &PluginContext,
    ) -> anyhow::Result<Vec<Box<dyn Stream>>> {
        let builders = connector.stream_builders();
        let default = connector.default_stream_builder();

        let mut result = Vec::with_capacity(catalog.streams.len());
        for entry in &catalog.streams {
            let builder = builders
                .get(entry.tap_stream_id.as_str())
                .or(default.as_ref())
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "no stream implementation for '{}' and no default stream defined \
                         for tap '{}'",
                        entry.tap_stream_id,
                        connector.name()
                    )
                })?;
            let stream = builder(entry, cx).with_context(|| {
                format!("failed to construct stream '{}'", entry.tap_stream_id)
            })?;
            result.push(stream);
        }
        Ok(result)
    }

    pub fn name(&self) -> &str {
        self.connector.name()
    }

    pub fn version(&self) -> &str {
        self.connector.version()
    }

    pub fn config(&self) -> &Config {
        &self.context.config
    }

    /// Handle on the shared checkpoint state.
    pub fn state(&self) -> SharedState {
        self.context.state.clone()
    }

    /// Streams in registry (catalog/discovery) order.
    pub fn streams(&self) -> impl Iterator<Item = &dyn Stream> {
        self.streams.values().map(|stream| stream.as_ref())
    }

    pub fn stream_names(&self) -> Vec<&str> {
        self.streams.keys().map(String::as_str).collect()
    }

    pub fn get_stream(&self, name: &str) -> Option<&dyn Stream> {
        self.streams.get(name).map(|stream| stream.as_ref())
    }

    /// Serialize the registry into a catalog document.
    pub fn catalog(&self) -> Catalog {
        Catalog {
            streams: self
                .streams
                .values()
                .map(|stream| stream.catalog_entry())
                .collect(),
        }
    }

    /// Write the catalog JSON to stdout and return the same string.
    ///
    /// This is the machine-readable contract other tools rely on to
    /// obtain a catalog without running a sync.
    pub fn run_discovery(&self) -> anyhow::Result<String> {
        let catalog_json = self.catalog().to_json_pretty()?;
        println!("{catalog_json}");
        Ok(catalog_json)
    }

    /// Sync a single stream to stdout.
    pub async fn sync_one(&mut self, stream_name: &str) -> anyhow::Result<()> {
        let mut out = JsonLinesWriter::stdout();
        self.sync_one_with(stream_name, &mut out).await
    }

    /// Sync a single stream through the given writer.
    pub async fn sync_one_with(
        &mut self,
        stream_name: &str,
        out: &mut dyn MessageWriter,
    ) -> anyhow::Result<()> {
        if let Some(stream) = self.streams.get_mut(stream_name) {
            return stream
                .sync(out)
                .await
                .with_context(|| format!("sync failed for stream '{stream_name}'"));
        }
        let mut known = self.stream_names();
        known.sort_unstable();
        bail!("could not find stream '{stream_name}' in streams list: {known:?}")
    }

    /// Sync every stream, in registry order, to stdout.
    pub async fn sync_all(&mut self) -> anyhow::Result<()> {
        let mut out = JsonLinesWriter::stdout();
        self.sync_all_with(&mut out).await
    }

    /// Sync every stream, in registry order, through the given writer.
    ///
    /// Strictly sequential: stream N completes (or fails) before stream
    /// N+1 begins. The first failure propagates immediately and halts
    /// the remaining streams.
    pub async fn sync_all_with(&mut self, out: &mut dyn MessageWriter) -> anyhow::Result<()> {
        for (name, stream) in self.streams.iter_mut() {
            tracing::info!("syncing stream '{name}'");
            stream
                .sync(out)
                .await
                .with_context(|| format!("sync failed for stream '{name}'"))?;
        }
        Ok(())
    }
}
