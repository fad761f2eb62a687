//! Windowed aggregation building blocks.
//!
//! - [`window`]: the open window's counters and its flushed snapshot
//! - [`history`]: ring of recent windows for the moving average
//! - [`top_k`]: per-dimension label counters
//! - [`alert`]: high-traffic state machine
//! - [`section`]: resource to section mapping

pub mod alert;
pub mod history;
pub mod section;
pub mod top_k;
pub mod window;

pub use alert::{AlertEvent, AlertMonitor, AlertState};
pub use history::HistoryRing;
pub use section::section;
pub use top_k::{Entry, TopK};
pub use window::{Breakdown, Window, WindowAccumulator, WindowSummary};
