//! Error types for redblock.

use thiserror::Error;

/// Error type for dataset loading.
///
/// Any of these leaves the engine for a unit in the `Unloaded` state.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The dataset could not be opened or read at all
    #[error("dataset source unavailable: {source_name}: {cause}")]
    SourceUnavailable {
        source_name: String,
        #[source]
        cause: std::io::Error,
    },

    /// A structurally valid record describes an inverted range
    #[error("malformed range at record {index}: start {start} > end {end}")]
    MalformedRange { index: usize, start: u32, end: u32 },
}

impl LoadError {
    pub(crate) fn unavailable(source_name: impl Into<String>, cause: std::io::Error) -> Self {
        LoadError::SourceUnavailable {
            source_name: source_name.into(),
            cause,
        }
    }
}

/// Non-fatal conditions found while loading a dataset.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadWarning {
    /// Byte length is not a multiple of the record size; the tail was dropped
    #[error("truncated input: {trailing_bytes} trailing bytes ignored")]
    TruncatedInput { trailing_bytes: usize },
}

/// Error type for redblock operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Dataset load failure
    #[error(transparent)]
    Load(#[from] LoadError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Unit name not present in the assembled configuration
    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    /// Invalid address list entry
    #[error("invalid entry on line {line}: {entry}")]
    InvalidEntry { line: usize, entry: String },

    /// Download error
    #[error("download error: {0}")]
    Download(#[from] reqwest::Error),
}

/// Result type alias for redblock operations.
pub type Result<T> = std::result::Result<T, Error>;
