use std::fmt;
use std::io;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Which end of the recording a rejected time window fell outside of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSide {
    BeforeRecording,
    AfterRecording,
}

impl fmt::Display for RangeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeSide::BeforeRecording => write!(f, "before the recording start"),
            RangeSide::AfterRecording => write!(f, "after the recording end"),
        }
    }
}

/// Formats the optional signal index carried by header errors.
fn signal_suffix(signal_index: &Option<usize>) -> String {
    match signal_index {
        Some(index) => format!(" (signal {})", index),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum EdfError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Header truncated while reading field `{field}`")]
    TruncatedHeader { field: &'static str },

    #[error("Malformed header field `{field}`{}: {value:?}", signal_suffix(.signal_index))]
    MalformedHeaderField {
        field: &'static str,
        signal_index: Option<usize>,
        value: String,
    },

    #[error("Data record {record_index} truncated in signal {signal_index}")]
    TruncatedRecord {
        record_index: usize,
        signal_index: usize,
    },

    #[error("Digital min equals digital max for signal {signal_index}")]
    InvalidCalibration { signal_index: usize },

    #[error("Requested time {requested} is {side} ({bound})")]
    OutOfRange {
        requested: NaiveDateTime,
        bound: NaiveDateTime,
        side: RangeSide,
    },

    #[error("Invalid time range: {start} .. {end}")]
    InvalidRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Signal '{label}' is not {expected}")]
    UnsupportedSignalKind {
        label: String,
        expected: &'static str,
    },

    #[error("Malformed annotation timestamp in data record {record_index}")]
    MalformedAnnotation { record_index: usize },

    #[error("Signal index {0} out of range")]
    InvalidSignalIndex(usize),
}

impl EdfError {
    pub(crate) fn malformed(field: &'static str, signal_index: Option<usize>, value: &str) -> Self {
        EdfError::MalformedHeaderField {
            field,
            signal_index,
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EdfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_field_message_includes_signal() {
        let err = EdfError::malformed("samples_per_record", Some(2), "x");
        assert_eq!(
            err.to_string(),
            "Malformed header field `samples_per_record` (signal 2): \"x\""
        );

        let err = EdfError::malformed("num_signals", None, "abcd");
        assert_eq!(err.to_string(), "Malformed header field `num_signals`: \"abcd\"");
    }
}
