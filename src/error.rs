//! Error types shared across the crate.

use std::path::PathBuf;

use thiserror::Error as ThisError;

/// Failure while reading an ATSP instance.
#[derive(Debug, ThisError, Clone, PartialEq)]
pub enum ParseError {
    #[error("instance file is empty")]
    Empty,
    #[error("no DIMENSION declaration found")]
    MissingDimension,
    #[error("invalid DIMENSION value `{0}`")]
    InvalidDimension(String),
    #[error("no EDGE_WEIGHT_SECTION found")]
    MissingEdgeWeights,
    #[error("not enough matrix data (expected {expected}, received {received})")]
    InsufficientData { expected: usize, received: usize },
    #[error("plain matrix row {row} has {found} entries, expected {expected}")]
    RaggedRow { row: usize, expected: usize, found: usize },
    #[error("invalid number `{0}` in plain matrix")]
    InvalidNumber(String),
}

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("solver error: {0}")]
    Solver(String),
    #[error("license error: {0}")]
    License(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn parse(path: impl Into<PathBuf>, source: ParseError) -> Self {
        Self::Parse { path: path.into(), source }
    }

    pub fn solver(message: impl Into<String>) -> Self {
        Self::Solver(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True when the failure concerns a single instance and a batch run may move on.
    pub fn is_instance_local(&self) -> bool {
        matches!(self, Error::Parse { .. } | Error::Solver(_))
    }
}

impl From<ParseError> for Error {
    fn from(source: ParseError) -> Self {
        Error::Parse { path: PathBuf::new(), source }
    }
}
