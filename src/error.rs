use std::path::PathBuf;

use crate::annotation::io::ParseError;
use crate::events::EventKind;

/// Errors raised by the library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A triple references an item that is not part of the item universe.
    #[error("unknown item id: {0}")]
    UnknownItem(String),

    #[error("invalid region '{token}': {problem}")]
    InvalidRegion { token: String, problem: String },

    #[error("invalid direction '{0}' (expected 'upstream' or 'downstream')")]
    InvalidDirection(String),

    #[error("{0} detection is not implemented")]
    NotImplemented(EventKind),

    #[error("cannot consolidate an empty event group")]
    EmptyGroup,

    #[error("malformed table line {line_no}: {problem}")]
    MalformedTable { line_no: usize, problem: String },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("I/O error: {source} ({path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
}

impl Error {
    /// Wrap an `io::Error` with the path it happened on.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }

    pub(crate) fn region(token: &str, problem: impl Into<String>) -> Self {
        Self::InvalidRegion {
            token: token.to_string(),
            problem: problem.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            source: err,
            path: PathBuf::from("<unknown>"),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
