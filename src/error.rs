//! Error types shared by the index, the workspace glue and the host capabilities.

use thiserror::Error;

/// Errors raised by [`TokenIndex`](crate::index::TokenIndex) operations.
///
/// Every variant leaves the index untouched: a scan either commits fully or
/// not at all.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The tokenizer pattern supplied for a document could not be compiled.
    #[error("invalid token pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The document is new and the configured ceiling of tracked documents
    /// has been reached. `first` is true only for the first rejection since
    /// the last reload, so callers can warn exactly once.
    #[error("document limit of {limit} reached")]
    CapacityExceeded { limit: usize, first: bool },

    /// The document is not tracked by the index.
    #[error("document not tracked: {0}")]
    NotTracked(String),
}

/// Errors raised by host capabilities (document source, editor).
#[derive(Error, Debug)]
pub enum HostError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document too large: {0} ({1} bytes)")]
    TooLarge(String, u64),

    #[error("document is not valid UTF-8: {0}")]
    NotText(String),

    #[error("editor error: {0}")]
    Editor(String),
}

/// Error type of workspace-level operations.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Host(#[from] HostError),
}

pub type Result<T> = std::result::Result<T, WorkspaceError>;
