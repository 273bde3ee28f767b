//! Error type for trace reading and rewriting
//!
//! [`TraceError`] covers everything that can go wrong while reading a trace:
//! lines too short for the expected field, numeric fields that don't parse,
//! and I/O failures on the underlying streams.
//!
//! All trace errors are fatal - the rewriter stops at the offending line.

use std::fmt;
use std::io;

/// Errors raised while parsing or rewriting trace lines
#[derive(Debug)]
pub enum TraceError {
    /// Line has fewer tokens than the field position requires
    MissingField {
        field: &'static str,
        position: usize,
        tokens: usize,
        line: usize,
    },

    /// Field expected to hold a non-negative decimal did not
    InvalidNumber {
        field: &'static str,
        text: String,
        line: usize,
    },

    /// Reading input or writing output failed
    Io(io::Error),
}

impl TraceError {
    /// 1-based input line the error refers to, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            TraceError::MissingField { line, .. } => Some(*line),
            TraceError::InvalidNumber { line, .. } => Some(*line),
            TraceError::Io(_) => None,
        }
    }
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceError::MissingField {
                field,
                position,
                tokens,
                line,
            } => {
                write!(
                    f,
                    "Malformed line {}: expected {} at token {}, but line has {} tokens",
                    line, field, position, tokens
                )
            }
            TraceError::InvalidNumber { field, text, line } => {
                write!(
                    f,
                    "Malformed line {}: {} '{}' is not a non-negative integer",
                    line, field, text
                )
            }
            TraceError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for TraceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TraceError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for TraceError {
    fn from(err: io::Error) -> Self {
        TraceError::Io(err)
    }
}
