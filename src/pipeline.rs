//! Ingestion pipeline: line reading and decoding on one side of a bounded
//! queue, the stream monitor on the other.
//!
//! The aggregation task drains every queued record before it waits, and only
//! then blocks on whichever comes first of the next record or the window
//! deadline. Closing the queue is the shutdown signal: the aggregation task
//! flushes its last window and returns the monitor.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, trace};

use crate::clf::Record;
use crate::config::MonitorConfig;
use crate::error::{Error, Result};
use crate::monitor::StreamMonitor;
use crate::sink::SummarySink;

/// Runs a [`StreamMonitor`] over a line-oriented input.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: MonitorConfig,
}

impl Pipeline {
    pub fn new(config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Consumes `reader` until end of input, writing summaries to `sink`.
    ///
    /// Returns the sink once every buffered record has been summarized. A
    /// read or decode error stops ingestion; the windows accumulated so far
    /// are still flushed before the error is returned.
    pub async fn run<R, S>(&self, reader: R, sink: S) -> Result<S>
    where
        R: AsyncRead + Unpin + Send,
        S: SummarySink + Send + 'static,
    {
        let monitor = StreamMonitor::new(self.config.clone(), sink)?;
        let (tx, rx) = mpsc::channel(self.config.queue_capacity);

        info!(
            window = ?self.config.window,
            span = ?self.config.span,
            threshold = self.config.threshold,
            "starting monitor"
        );
        let aggregator = tokio::spawn(aggregate(monitor, rx));

        // `tx` is moved in and dropped on return, closing the queue.
        let ingested = ingest(reader, tx).await;
        if let Err(e) = &ingested {
            error!(stage = e.stage(), "ingestion stopped: {}", e);
        }

        let monitor = aggregator
            .await
            .map_err(|e| Error::Runtime(format!("aggregation task failed: {}", e)))??;
        ingested?;

        info!(windows = monitor.flushed(), "monitor finished");
        Ok(monitor.into_sink())
    }
}

/// Reads and decodes lines, handing records to the aggregation task in order.
async fn ingest<R>(reader: R, tx: mpsc::Sender<Record>) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut count = 0;

    while let Some(line) = lines.next_line().await.map_err(Error::Read)? {
        if line.trim().is_empty() {
            trace!("skipping blank line");
            continue;
        }
        let record = Record::parse(&line).map_err(|source| Error::Decode { line, source })?;
        if tx.send(record).await.is_err() {
            debug!("aggregation task gone, stopping ingestion");
            break;
        }
        count += 1;
    }

    debug!(records = count, "input exhausted");
    Ok(count)
}

/// Owns the monitor until the queue closes.
async fn aggregate<S>(
    mut monitor: StreamMonitor<S>,
    mut rx: mpsc::Receiver<Record>,
) -> Result<StreamMonitor<S>>
where
    S: SummarySink,
{
    loop {
        match rx.try_recv() {
            Ok(record) => {
                monitor.handle(&record)?;
                continue;
            }
            Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        let deadline = monitor.deadline();
        tokio::select! {
            received = rx.recv() => match received {
                Some(record) => monitor.handle(&record)?,
                None => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                monitor.tick()?;
            }
        }
    }

    monitor.finish()?;
    Ok(monitor)
}
