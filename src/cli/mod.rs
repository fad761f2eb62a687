//! Command-line interface module.
//!
//! Argument definitions live in [`crate::config`]; this module wires them to
//! the pipeline.

pub mod handlers;

pub use crate::config::{Args, LoggingArgs};
pub use handlers::handle_monitor;
