use std::io;
use tracing::{debug, info};

use crate::config::{Args, OutputFormat, Settings};
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use crate::sink::{JsonSink, SummarySink, TextSink};

/// Loads configuration, then monitors the input named by `args` (or stdin)
/// until it is exhausted. Summaries go to stdout.
pub async fn handle_monitor(args: &Args) -> Result<()> {
    let settings = Settings::load(args)?;
    debug!(?settings, "configuration loaded");

    let pipeline = Pipeline::new(settings.monitor_config()?)?;
    let sink = stdout_sink(settings.monitor.format);

    match &args.file {
        Some(path) => {
            info!(path = %path.display(), "reading input file");
            let file = tokio::fs::File::open(path).await.map_err(Error::Read)?;
            pipeline.run(file, sink).await?;
        }
        None => {
            info!("reading stdin");
            pipeline.run(tokio::io::stdin(), sink).await?;
        }
    }
    Ok(())
}

fn stdout_sink(format: OutputFormat) -> Box<dyn SummarySink + Send> {
    match format {
        OutputFormat::Text => Box::new(TextSink::new(io::stdout())),
        OutputFormat::Json => Box::new(JsonSink::new(io::stdout())),
    }
}
