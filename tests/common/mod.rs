//! Common test utilities for monitor and pipeline tests

#![allow(dead_code)]

use chrono::{DateTime, Duration, FixedOffset};
use logmon_core::aggregation::{AlertEvent, WindowSummary};
use logmon_core::clf::{format_timestamp, parse_timestamp};
use logmon_core::{Result, SummarySink};

pub const BASE_TIME: &str = "10/Oct/2000:13:55:36 -0700";

pub fn base_time() -> DateTime<FixedOffset> {
    parse_timestamp(BASE_TIME).unwrap()
}

/// A Common Log Format line `offset_secs` after [`BASE_TIME`].
pub fn clf_line(offset_secs: i64, resource: &str) -> String {
    let ts = base_time() + Duration::seconds(offset_secs);
    format!(
        "127.0.0.1 - frank [{}] \"GET {} HTTP/1.0\" 200 512\n",
        format_timestamp(&ts),
        resource
    )
}

/// Collects everything a monitor emits.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub windows: Vec<WindowSummary>,
    pub events: Vec<AlertEvent>,
    pub flushes: usize,
}

impl RecordingSink {
    pub fn hits(&self) -> Vec<u64> {
        self.windows.iter().map(|w| w.hits).collect()
    }
}

impl SummarySink for RecordingSink {
    fn window(&mut self, summary: &WindowSummary) -> Result<()> {
        self.windows.push(summary.clone());
        Ok(())
    }

    fn alert(&mut self, event: &AlertEvent) -> Result<()> {
        self.events.push(event.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
