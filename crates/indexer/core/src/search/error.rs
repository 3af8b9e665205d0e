use crate::QueryError;
use thiserror::Error;

/// Error type for the [`crate::SearchEngine`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SearchError {
    /// The key is neither a block number nor a hex string.
    #[error("invalid search key: {0}")]
    InvalidKey(String),

    /// No selected partition has the requested block.
    #[error("not found")]
    NotFound,

    /// The search was cancelled by the caller.
    #[error("search cancelled")]
    Cancelled,

    /// An index lookup task did not complete.
    #[error("index lookup aborted: {0}")]
    LookupAborted(String),

    /// An index lookup failed.
    #[error(transparent)]
    Query(#[from] QueryError),
}
