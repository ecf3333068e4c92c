use std::fmt;

use crate::vm::Segment;

/// Where a command came from: translation unit name and 1-based line.
///
/// Line 0 means the command was fed to the translator directly rather than
/// parsed from source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub unit: String,
    pub line: usize,
}

impl Location {
    #[must_use]
    pub fn new(unit: impl Into<String>, line: usize) -> Self {
        Self {
            unit: unit.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.unit)
        } else {
            write!(f, "{}:{}", self.unit, self.line)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{location}: malformed command `{text}`: {reason}")]
    MalformedCommand {
        location: Location,
        text: String,
        reason: String,
    },

    #[error("{location}: unknown segment `{segment}` in `{text}`")]
    UnknownSegment {
        location: Location,
        segment: String,
        text: String,
    },

    #[error("{location}: index {index} is out of range for segment `{segment}` (max {max})")]
    IndexOutOfRange {
        location: Location,
        segment: Segment,
        index: u16,
        max: u16,
    },

    #[error("{location}: `{text}` refers to label `{label}` which is never defined in `{function}`")]
    UndefinedLabel {
        location: Location,
        text: String,
        label: String,
        function: String,
    },

    #[error("{location}: `{symbol}` is defined more than once")]
    DuplicateLabel { location: Location, symbol: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Source location of the offending command, if the error has one.
    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        match self {
            Error::MalformedCommand { location, .. }
            | Error::UnknownSegment { location, .. }
            | Error::IndexOutOfRange { location, .. }
            | Error::UndefinedLabel { location, .. }
            | Error::DuplicateLabel { location, .. } => Some(location),
            Error::Internal(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
