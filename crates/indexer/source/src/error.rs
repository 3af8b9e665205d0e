use thiserror::Error;

/// Errors returned by a [`crate::BlockSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    /// The JSON-RPC client could not be built.
    #[error("failed to build rpc client: {0}")]
    ClientBuild(String),

    /// The JSON-RPC request failed.
    #[error(transparent)]
    Client(#[from] jsonrpsee::core::ClientError),

    /// The partition answered with data that does not belong to the request.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}
