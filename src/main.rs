use admin_capture::{load_config, print_report, setup_logging, CaptureError, CaptureRunner, Cli};
use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    setup_logging(args.verbose).map_err(|e| anyhow::anyhow!(e))?;

    info!("Starting admin-capture v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)
        .await
        .context("Failed to load configuration")?;
    let runner = CaptureRunner::new(config)?;

    // Dropping the run future on interrupt releases the browser
    let report = tokio::select! {
        result = runner.run() => result?,
        _ = signal::ctrl_c() => {
            warn!("Received interrupt, aborting capture");
            return Err(CaptureError::Interrupted.into());
        }
    };

    print_report(&report, args.json)?;

    info!("admin-capture finished");
    Ok(())
}
