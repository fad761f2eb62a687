//! Streaming HTTP access-log monitor.
//!
//! Lines in Common Log Format are decoded into [`Record`]s and grouped into
//! fixed-length windows. Each flushed window is summarized (hits plus the
//! top sections, methods, protocols and status codes) and pushed into a
//! short history whose moving average drives a high-traffic alert.

pub mod aggregation;
pub mod cli;
pub mod clf;
pub mod config;
pub mod error;
pub mod monitor;
pub mod pipeline;
pub mod sink;

// Re-export commonly used types
pub use clf::Record;
pub use config::MonitorConfig;
pub use error::{Error, Result};
pub use monitor::StreamMonitor;
pub use pipeline::Pipeline;
pub use sink::{JsonSink, SummarySink, TextSink};
