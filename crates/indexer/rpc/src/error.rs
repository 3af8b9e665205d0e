use jsonrpsee::types::{ErrorObject, ErrorObjectOwned, error::ErrorCode};
use thiserror::Error;
use unitscan_core::{QueryError, SearchError};
use unitscan_source::SourceError;

/// Failure of an `explorer` request, as reported to the caller.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RpcError {
    /// Nothing matched the request.
    #[error("not found")]
    NotFound,

    /// A parameter was rejected.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// The indexer failed to answer.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RpcError {
    /// Error code reported for [`RpcError::NotFound`].
    pub const NOT_FOUND_CODE: i32 = -32001;

    /// The JSON-RPC error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::NotFound => Self::NOT_FOUND_CODE,
            Self::InvalidParams(_) => ErrorCode::InvalidParams.code(),
            Self::Internal(_) => ErrorCode::InternalError.code(),
        }
    }
}

impl From<QueryError> for RpcError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidArgument(reason) => Self::InvalidParams(reason.to_string()),
            QueryError::Storage(err) => Self::Internal(err.to_string()),
        }
    }
}

impl From<SearchError> for RpcError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidKey(_) => Self::InvalidParams(err.to_string()),
            SearchError::NotFound => Self::NotFound,
            SearchError::Cancelled | SearchError::LookupAborted(_) => {
                Self::Internal(err.to_string())
            }
            SearchError::Query(err) => err.into(),
        }
    }
}

impl From<SourceError> for RpcError {
    fn from(err: SourceError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<RpcError> for ErrorObjectOwned {
    fn from(err: RpcError) -> Self {
        ErrorObject::owned(err.code(), err.to_string(), None::<()>)
    }
}
