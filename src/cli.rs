//! Command-line interface shared by every connector built on this kit.
//!
//! # Usage Examples
//!
//! ```bash
//! # Discovery: print the catalog JSON and exit
//! tap-sample --discover
//!
//! # Full sync with inline configuration
//! tap-sample --config '{"api_key": "secret"}' --catalog catalog.json
//!
//! # Resume from checkpoint state
//! tap-sample --config config.json --state state.json
//!
//! # Replay a message file into a target
//! target-sample --config config.json --input messages.singer
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use singer_core::DocumentInput;

use crate::tap::{Tap, TapConnector};
use crate::target::{Target, TargetConnector};

/// Flag surface of a tap process.
#[derive(Parser, Debug)]
#[command(about = "Extract data and emit it as line-delimited messages")]
#[command(long_about = None)]
pub struct TapArgs {
    /// Print the tap name and version, then exit
    #[arg(long)]
    pub version: bool,

    /// Run discovery and print the catalog JSON to stdout
    #[arg(long)]
    pub discover: bool,

    /// Plugin configuration, as a file path or inline JSON object
    #[arg(long, value_name = "PATH_OR_JSON")]
    pub config: Option<String>,

    /// Catalog document; when present, streams are loaded from it
    /// instead of discovered
    #[arg(long, value_name = "PATH_OR_JSON")]
    pub catalog: Option<String>,

    /// Prior checkpoint state
    #[arg(long, value_name = "PATH_OR_JSON")]
    pub state: Option<String>,
}

/// Flag surface of a target process.
#[derive(Parser, Debug)]
#[command(about = "Load line-delimited messages into a destination")]
#[command(long_about = None)]
pub struct TargetArgs {
    /// Print the target name and version, then exit
    #[arg(long)]
    pub version: bool,

    /// Plugin configuration, as a file path or inline JSON object
    #[arg(long, value_name = "PATH_OR_JSON")]
    pub config: Option<String>,

    /// Input message file; stdin when omitted
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,
}

/// Initialize tracing for a connector process. Call once from `main`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Parse the process arguments and run the tap.
pub async fn run_tap(connector: Arc<dyn TapConnector>) -> anyhow::Result<()> {
    run_tap_with_args(connector, TapArgs::parse()).await
}

/// Run a tap against already-parsed arguments.
///
/// `--version` prints and returns without constructing anything;
/// `--discover` prints the catalog; otherwise every stream is synced.
pub async fn run_tap_with_args(
    connector: Arc<dyn TapConnector>,
    args: TapArgs,
) -> anyhow::Result<()> {
    if args.version {
        println!("{} v{}", connector.name(), connector.version());
        return Ok(());
    }

    let mut tap = Tap::new(
        connector,
        parse_input(args.config.as_deref())?,
        parse_input(args.catalog.as_deref())?,
        parse_input(args.state.as_deref())?,
    )
    .await?;

    if args.discover {
        tap.run_discovery()?;
    } else {
        tap.sync_all().await?;
    }
    Ok(())
}

/// Parse the process arguments and run the target.
pub async fn run_target(connector: Box<dyn TargetConnector>) -> anyhow::Result<()> {
    run_target_with_args(connector, TargetArgs::parse()).await
}

/// Run a target against already-parsed arguments.
pub async fn run_target_with_args(
    connector: Box<dyn TargetConnector>,
    args: TargetArgs,
) -> anyhow::Result<()> {
    if args.version {
        println!("{} v{}", connector.name(), connector.version());
        return Ok(());
    }

    let mut target = Target::new(connector, parse_input(args.config.as_deref())?).await?;
    match args.input {
        Some(path) => {
            target.process_file(&path).await?;
        }
        None => {
            let buffered = std::io::read_to_string(std::io::stdin())?;
            target.process_lines(std::io::Cursor::new(buffered)).await?;
        }
    }
    Ok(())
}

fn parse_input(raw: Option<&str>) -> anyhow::Result<Option<DocumentInput>> {
    Ok(raw.map(DocumentInput::from_cli_arg).transpose()?)
}
