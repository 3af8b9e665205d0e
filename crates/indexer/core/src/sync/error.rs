use crate::IndexerError;
use thiserror::Error;
use unitscan_source::SourceError;
use unitscan_storage::StorageError;
use unitscan_types::PartitionId;

/// Error type for the [`crate::SyncEngine`] and the [`crate::BlockProcessor`].
#[derive(Error, Debug)]
pub enum SyncError {
    /// The sync configuration is unusable.
    #[error("invalid sync configuration: {0}")]
    Configuration(String),

    /// A block could not be indexed.
    #[error(transparent)]
    MalformedBlock(#[from] IndexerError),

    /// A block was received that is not newer than the partition's progress.
    #[error(
        "block {block_number} of partition {partition_id} is not after the last indexed block {last_indexed}"
    )]
    OutOfOrderBlock {
        /// The partition of the block.
        partition_id: PartitionId,
        /// The received block number.
        block_number: u64,
        /// The last indexed block number.
        last_indexed: u64,
    },

    /// The block source failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The sync was cancelled.
    #[error("sync cancelled")]
    Cancelled,
}
