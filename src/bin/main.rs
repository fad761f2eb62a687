//! logmon binary.
//!
//! Reads an HTTP access log from stdin or `--file`, prints a summary for
//! every window and a line whenever the high-traffic alert changes state.

use clap::Parser;
use logmon_core::cli::{handle_monitor, Args};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for summaries
    let level = args.logging.get_effective_level();
    let builder =
        EnvFilter::builder().with_default_directive(LevelFilter::from_level(level).into());
    let filter = match args.logging.log_filter.as_deref() {
        Some(directives) => builder.parse_lossy(directives),
        None => builder.from_env_lossy(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    info!("logmon starting up");

    handle_monitor(&args).await.map_err(|e| {
        let stage = e.stage();
        anyhow::Error::new(e).context(format!("{} stage failed", stage))
    })?;

    Ok(())
}
