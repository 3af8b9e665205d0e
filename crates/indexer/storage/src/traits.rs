use crate::StorageError;
use std::fmt::Debug;
use unitscan_types::{BlockRecord, PartitionId, TxRecord};

/// Tracks how far each partition has been indexed.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
pub trait ProgressStorage: Debug + Send + Sync {
    /// Returns the number of the last indexed block of a partition, `0` if none was indexed.
    fn get_partition_progress(&self, partition_id: PartitionId) -> Result<u64, StorageError>;

    /// Sets the number of the last indexed block of a partition.
    fn set_partition_progress(
        &self,
        partition_id: PartitionId,
        block_number: u64,
    ) -> Result<(), StorageError>;

    /// Returns every partition that has a progress row, in ascending order.
    fn known_partitions(&self) -> Result<Vec<PartitionId>, StorageError>;
}

/// Persists index records.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
pub trait IndexStorageWriter: Debug + Send + Sync {
    /// Upserts a block, keyed by `(partition_id, block_number)`.
    fn put_block(&self, block: &BlockRecord) -> Result<(), StorageError>;

    /// Upserts a transaction, keyed by its record hash.
    ///
    /// Returns the insertion sequence of the stored record. Re-inserting a known transaction
    /// keeps the sequence it was first stored with.
    fn put_tx(&self, tx: TxRecord) -> Result<u64, StorageError>;

    /// Stores the transactions of a block, the block itself and advances the partition progress
    /// to the block's number, all in one step.
    ///
    /// Readers observe either none or all of the writes.
    fn commit_block(&self, block: &BlockRecord, txs: Vec<TxRecord>) -> Result<(), StorageError>;
}

/// Reads index records.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
pub trait IndexStorageReader: Debug + Send + Sync {
    /// Returns a block of a partition.
    fn get_block(
        &self,
        partition_id: PartitionId,
        block_number: u64,
    ) -> Result<Option<BlockRecord>, StorageError>;

    /// Returns up to `limit` blocks of a partition, starting at `from` (inclusive) and walking
    /// towards the first block. Empty blocks are skipped before counting unless
    /// `include_empty` is set.
    fn get_blocks_desc(
        &self,
        partition_id: PartitionId,
        from: u64,
        limit: usize,
        include_empty: bool,
    ) -> Result<Vec<BlockRecord>, StorageError>;

    /// Returns the transaction whose record hash or order hash equals `hash`.
    fn get_tx(&self, hash: &[u8]) -> Result<Option<TxRecord>, StorageError>;

    /// Returns up to `limit` transactions of a partition in descending insertion order,
    /// starting at insertion sequence `from` (inclusive), or at the newest when `None`.
    fn get_txs_desc(
        &self,
        partition_id: PartitionId,
        from: Option<u64>,
        limit: usize,
    ) -> Result<Vec<TxRecord>, StorageError>;

    /// Returns the transactions of a block in block order.
    fn get_txs_by_block_number(
        &self,
        partition_id: PartitionId,
        block_number: u64,
    ) -> Result<Vec<TxRecord>, StorageError>;

    /// Returns the transactions of a partition that touched `unit_id`, newest first.
    fn get_txs_by_unit_id(
        &self,
        partition_id: PartitionId,
        unit_id: &[u8],
    ) -> Result<Vec<TxRecord>, StorageError>;

    /// Returns the transactions of a partition matching `key` as a record hash, an order hash
    /// or a target unit identifier, newest first and without duplicates.
    fn find_txs(&self, partition_id: PartitionId, key: &[u8])
    -> Result<Vec<TxRecord>, StorageError>;
}

/// The complete storage contract required by the indexer.
pub trait IndexStorage: ProgressStorage + IndexStorageWriter + IndexStorageReader {}

impl<T> IndexStorage for T where T: ProgressStorage + IndexStorageWriter + IndexStorageReader {}
