use thiserror::Error;

/// Error type for the [`crate::BlockIndexer`]. Every variant marks the block as malformed.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum IndexerError {
    /// The block carries no round number.
    #[error("malformed block: missing round number")]
    MissingRoundNumber,

    /// A transaction order embedded in the block cannot be decoded.
    #[error("malformed block: order of transaction {index} cannot be decoded: {source}")]
    MalformedTransaction {
        /// Position of the transaction in the block.
        index: usize,
        /// The decoding failure.
        #[source]
        source: alloy_rlp::Error,
    },
}
