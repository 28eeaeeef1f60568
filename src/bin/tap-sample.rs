//! Reference tap wired to the in-memory sample connector.

use std::sync::Arc;

use singer_kit::cli;
use singer_kit::testing::samples::SampleTap;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::init_tracing();

    if let Err(e) = cli::run_tap(Arc::new(SampleTap)).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
