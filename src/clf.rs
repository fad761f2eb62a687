//! Common Log Format records.
//!
//! Decodes lines of the form
//! `host ident authuser [date] "request" status bytes`, where `-` marks an
//! absent scalar field, `[-]` an absent date and `"-"` an absent request.
//! Records format back to the same layout through [`fmt::Display`].

use chrono::{DateTime, FixedOffset};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Date layout used by the Common Log Format, e.g. `10/Oct/2000:13:55:36 -0700`.
pub const DATE_LAYOUT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Reasons a line fails to decode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected character {found:?} at start of {field} field")]
    UnexpectedChar { field: &'static str, found: char },

    #[error("unterminated {field} field")]
    Unterminated { field: &'static str },

    #[error("expected a space after the {field} field, found {found:?}")]
    MissingSeparator { field: &'static str, found: char },

    #[error("invalid date {value:?}: {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid status code {0:?}")]
    InvalidStatus(String),

    #[error("invalid byte count {0:?}")]
    InvalidBytes(String),
}

/// A decoded access-log entry. Absent fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub host: Option<String>,
    pub ident: Option<String>,
    pub auth_user: Option<String>,
    pub timestamp: Option<DateTime<FixedOffset>>,
    /// Raw request line, e.g. `GET /index.html HTTP/1.0`
    pub request: Option<String>,
    pub status: Option<u16>,
    pub bytes: Option<u64>,
}

impl Record {
    /// Decodes a single line (without its trailing newline).
    ///
    /// A line that ends early yields the fields read so far; any text after
    /// the byte count is ignored.
    pub fn parse(line: &str) -> Result<Self, DecodeError> {
        let mut record = Record::default();
        let mut cursor = Cursor::new(line);

        let (host, more) = cursor.token();
        record.host = scalar(host);
        if !more {
            return Ok(record);
        }

        let (ident, more) = cursor.token();
        record.ident = scalar(ident);
        if !more {
            return Ok(record);
        }

        let (auth_user, more) = cursor.token();
        record.auth_user = scalar(auth_user);
        if !more {
            return Ok(record);
        }

        match cursor.delimited("date", '[', ']')? {
            None => return Ok(record),
            Some(date) => record.timestamp = parse_date(date)?,
        }
        if !cursor.separator("date")? {
            return Ok(record);
        }

        match cursor.delimited("request", '"', '"')? {
            None => return Ok(record),
            Some(request) => record.request = scalar(request),
        }
        if !cursor.separator("request")? {
            return Ok(record);
        }

        let (status, more) = cursor.token();
        record.status = number(status).map_err(|_| DecodeError::InvalidStatus(status.to_string()))?;
        if !more {
            return Ok(record);
        }

        let (bytes, _) = cursor.token();
        record.bytes = number(bytes).map_err(|_| DecodeError::InvalidBytes(bytes.to_string()))?;

        Ok(record)
    }

    /// Splits the request into `(method, resource, protocol)`.
    ///
    /// Anything other than exactly three single-space separated tokens yields
    /// three empty strings.
    pub fn request_fields(&self) -> (&str, &str, &str) {
        let Some(request) = self.request.as_deref() else {
            return ("", "", "");
        };
        let mut parts = request.split(' ');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(method), Some(resource), Some(protocol), None) => (method, resource, protocol),
            _ => ("", "", ""),
        }
    }

    pub fn method(&self) -> &str {
        self.request_fields().0
    }

    pub fn resource(&self) -> &str {
        self.request_fields().1
    }

    pub fn protocol(&self) -> &str {
        self.request_fields().2
    }
}

impl FromStr for Record {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Record::parse(s)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ",
            self.host.as_deref().unwrap_or("-"),
            self.ident.as_deref().unwrap_or("-"),
            self.auth_user.as_deref().unwrap_or("-"),
        )?;
        match &self.timestamp {
            Some(ts) => write!(f, "[{}] ", format_timestamp(ts))?,
            None => f.write_str("- ")?,
        }
        match &self.request {
            Some(request) => write!(f, "\"{}\" ", request)?,
            None => f.write_str("- ")?,
        }
        match self.status {
            Some(status) => write!(f, "{} ", status)?,
            None => f.write_str("- ")?,
        }
        match self.bytes {
            Some(bytes) => write!(f, "{}", bytes),
            None => f.write_str("-"),
        }
    }
}

/// Formats a timestamp with [`DATE_LAYOUT`].
pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.format(DATE_LAYOUT).to_string()
}

/// Parses a timestamp written with [`DATE_LAYOUT`].
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, DecodeError> {
    DateTime::parse_from_str(value, DATE_LAYOUT).map_err(|source| DecodeError::InvalidDate {
        value: value.to_string(),
        source,
    })
}

fn scalar(value: &str) -> Option<String> {
    match value {
        "" | "-" => None,
        value => Some(value.to_string()),
    }
}

fn number<T: FromStr>(value: &str) -> Result<Option<T>, T::Err> {
    match value {
        "" | "-" => Ok(None),
        value => value.parse().map(Some),
    }
}

fn parse_date(value: &str) -> Result<Option<DateTime<FixedOffset>>, DecodeError> {
    match value {
        "-" => Ok(None),
        value => parse_timestamp(value).map(Some),
    }
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    /// Next space-delimited token, and whether input remains after it.
    fn token(&mut self) -> (&'a str, bool) {
        match self.rest.find(' ') {
            Some(idx) => {
                let token = &self.rest[..idx];
                self.rest = &self.rest[idx + 1..];
                (token, true)
            }
            None => {
                let token = self.rest;
                self.rest = "";
                (token, false)
            }
        }
    }

    /// Either a bare `-` or a body wrapped in `open`/`close`. `None` once the
    /// input is exhausted.
    fn delimited(
        &mut self,
        field: &'static str,
        open: char,
        close: char,
    ) -> Result<Option<&'a str>, DecodeError> {
        match self.rest.chars().next() {
            None => Ok(None),
            Some('-') => {
                self.rest = &self.rest[1..];
                Ok(Some("-"))
            }
            Some(c) if c == open => {
                let body = &self.rest[open.len_utf8()..];
                let end = body.find(close).ok_or(DecodeError::Unterminated { field })?;
                self.rest = &body[end + close.len_utf8()..];
                Ok(Some(&body[..end]))
            }
            Some(found) => Err(DecodeError::UnexpectedChar { field, found }),
        }
    }

    /// Consumes the space following a delimited field. `false` once the input
    /// is exhausted.
    fn separator(&mut self, field: &'static str) -> Result<bool, DecodeError> {
        match self.rest.chars().next() {
            None => Ok(false),
            Some(' ') => {
                self.rest = &self.rest[1..];
                Ok(true)
            }
            Some(found) => Err(DecodeError::MissingSeparator { field, found }),
        }
    }
}
