//! Error types for the logmon pipeline.

use std::io;
use std::result;
use thiserror::Error;

use crate::clf::DecodeError;

/// A specialized Result type for logmon operations.
pub type Result<T> = result::Result<T, Error>;

/// The error type for logmon operations.
///
/// Only input, decode, output and setup failures surface here. Records with
/// missing or out-of-order timestamps are not errors and never reach this type.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading the input stream failed
    #[error("failed to read line: {0}")]
    Read(#[source] io::Error),

    /// A line could not be decoded as a Common Log Format record
    #[error("failed to parse line {line:?}: {source}")]
    Decode {
        line: String,
        #[source]
        source: DecodeError,
    },

    /// Writing a summary or alert to the sink failed
    #[error("failed to write summary: {0}")]
    Write(#[source] io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Task or runtime failures
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Serialization errors from the JSON sink
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// The pipeline stage the error originated from.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Read(_) => "read",
            Error::Decode { .. } => "decode",
            Error::Write(_) | Error::Serialization(_) => "write",
            Error::Config(_) => "config",
            Error::Runtime(_) => "runtime",
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
