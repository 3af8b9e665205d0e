use thiserror::Error;
use unitscan_storage::StorageError;

/// Error type for the [`crate::QueryService`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    /// A request parameter is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
