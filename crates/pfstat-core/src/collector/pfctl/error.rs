//! Error types for `pfctl -s info` parsing.

use std::num::ParseIntError;

use thiserror::Error;

/// Failure inside a single stanza.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// A counter label never appeared in the stanza.
    #[error("counter \"{label}\" not found")]
    MissingCounter { label: &'static str },
    /// The value after a known label is not a valid base-10 `i64`.
    #[error("invalid value {value:?} for \"{label}\": {source}")]
    InvalidInteger {
        label: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Failure of a whole parse run. No counters are produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A mandatory section header never appeared.
    #[error("cannot find header \"{section}\" in {command} output")]
    MissingSection {
        section: &'static str,
        command: String,
    },
    /// A section was located but its data was incomplete or malformed.
    #[error("{stanza} section of {command} output: {source}")]
    Stanza {
        stanza: &'static str,
        command: String,
        #[source]
        source: ExtractError,
    },
}

impl ParseError {
    /// Label of the missing counter, if this is a counter-not-found error.
    pub fn missing_counter(&self) -> Option<&'static str> {
        match self {
            ParseError::Stanza {
                source: ExtractError::MissingCounter { label },
                ..
            } => Some(*label),
            _ => None,
        }
    }
}
