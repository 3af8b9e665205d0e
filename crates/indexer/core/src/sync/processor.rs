use crate::{BlockIndexer, Metrics, SyncError};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use tracing::debug;
use unitscan_storage::{IndexStorageWriter, ProgressStorage};
use unitscan_types::{Block, PartitionId};

/// Consumes the blocks produced by a [`crate::SyncEngine`], in fetch order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlockHandler: Debug + Send + Sync {
    /// Handles one block. An error stops the sync.
    async fn handle_block(&self, block: Block) -> Result<(), SyncError>;
}

/// Indexes blocks of one partition and commits them to the store.
#[derive(Debug)]
pub struct BlockProcessor<S> {
    indexer: BlockIndexer,
    store: Arc<S>,
}

impl<S> BlockProcessor<S>
where
    S: ProgressStorage + IndexStorageWriter,
{
    /// Creates a processor committing through `store`.
    pub const fn new(indexer: BlockIndexer, store: Arc<S>) -> Self {
        Self { indexer, store }
    }

    /// The partition whose blocks are processed.
    pub const fn partition_id(&self) -> PartitionId {
        self.indexer.partition_id()
    }

    /// Indexes `block` and commits its records together with the advanced progress.
    ///
    /// # Errors
    /// Fails with [`SyncError::OutOfOrderBlock`] when the block is not newer than the
    /// partition's progress, leaving the store untouched.
    pub fn process_block(&self, block: &Block) -> Result<(), SyncError> {
        let partition_id = self.partition_id();
        let last_indexed = self.store.get_partition_progress(partition_id)?;

        let (record, txs) = self.indexer.index(block)?;
        if record.block_number <= last_indexed {
            return Err(SyncError::OutOfOrderBlock {
                partition_id,
                block_number: record.block_number,
                last_indexed,
            });
        }

        let tx_count = txs.len();
        self.store.commit_block(&record, txs)?;

        debug!(
            target: "indexer",
            partition_id,
            block_number = record.block_number,
            tx_count,
            "Indexed block"
        );
        let labels = [("partition_id", partition_id.to_string())];
        metrics::counter!(Metrics::BLOCKS_INDEXED_TOTAL, &labels).increment(1);
        metrics::counter!(Metrics::TXS_INDEXED_TOTAL, &labels).increment(tx_count as u64);
        metrics::gauge!(Metrics::PARTITION_PROGRESS, &labels).set(record.block_number as f64);

        Ok(())
    }
}

#[async_trait]
impl<S> BlockHandler for BlockProcessor<S>
where
    S: ProgressStorage + IndexStorageWriter,
{
    async fn handle_block(&self, block: Block) -> Result<(), SyncError> {
        self.process_block(&block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IndexerError;
    use unitscan_storage::{
        InMemoryStore, IndexStorageReader, MockIndexStorageWriter, MockProgressStorage,
        StorageError,
    };
    use unitscan_types::{Bytes, UnicityCertificate};

    /// Combines the generated mocks into one store.
    #[derive(Debug)]
    struct MockStore {
        progress: MockProgressStorage,
        writer: MockIndexStorageWriter,
    }

    impl ProgressStorage for MockStore {
        fn get_partition_progress(&self, partition_id: PartitionId) -> Result<u64, StorageError> {
            self.progress.get_partition_progress(partition_id)
        }

        fn set_partition_progress(
            &self,
            partition_id: PartitionId,
            block_number: u64,
        ) -> Result<(), StorageError> {
            self.progress.set_partition_progress(partition_id, block_number)
        }

        fn known_partitions(&self) -> Result<Vec<PartitionId>, StorageError> {
            self.progress.known_partitions()
        }
    }

    impl IndexStorageWriter for MockStore {
        fn put_block(&self, block: &unitscan_types::BlockRecord) -> Result<(), StorageError> {
            self.writer.put_block(block)
        }

        fn put_tx(&self, tx: unitscan_types::TxRecord) -> Result<u64, StorageError> {
            self.writer.put_tx(tx)
        }

        fn commit_block(
            &self,
            block: &unitscan_types::BlockRecord,
            txs: Vec<unitscan_types::TxRecord>,
        ) -> Result<(), StorageError> {
            self.writer.commit_block(block, txs)
        }
    }

    fn block(round_number: u64) -> Block {
        Block {
            unicity_certificate: Some(UnicityCertificate {
                round_number,
                raw: Bytes::from_static(b"uc"),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_process_block_commits_and_advances_progress() {
        let store = Arc::new(InMemoryStore::new());
        let processor = BlockProcessor::new(BlockIndexer::new(1, 2), store.clone());

        processor.process_block(&block(1)).unwrap();
        processor.process_block(&block(4)).unwrap();

        assert_eq!(store.get_partition_progress(1).unwrap(), 4);
        assert!(store.get_block(1, 4).unwrap().is_some());
    }

    #[test]
    fn test_process_block_rejects_stale_block() {
        let store = Arc::new(InMemoryStore::new());
        let processor = BlockProcessor::new(BlockIndexer::new(1, 2), store.clone());
        processor.process_block(&block(3)).unwrap();

        let err = processor.process_block(&block(3)).unwrap_err();
        assert!(matches!(
            err,
            SyncError::OutOfOrderBlock { partition_id: 1, block_number: 3, last_indexed: 3 }
        ));
        assert_eq!(store.get_partition_progress(1).unwrap(), 3);
    }

    #[test]
    fn test_process_block_rejects_malformed_block_without_writing() {
        let mut progress = MockProgressStorage::new();
        progress.expect_get_partition_progress().returning(|_| Ok(0));
        let mut writer = MockIndexStorageWriter::new();
        writer.expect_commit_block().never();

        let store = Arc::new(MockStore { progress, writer });
        let processor = BlockProcessor::new(BlockIndexer::new(1, 2), store);

        let err = processor.process_block(&Block::default()).unwrap_err();
        assert!(matches!(err, SyncError::MalformedBlock(IndexerError::MissingRoundNumber)));
    }

    #[test]
    fn test_process_block_propagates_storage_error() {
        let mut progress = MockProgressStorage::new();
        progress.expect_get_partition_progress().returning(|_| Ok(0));
        let mut writer = MockIndexStorageWriter::new();
        writer
            .expect_commit_block()
            .times(1)
            .returning(|_, _| Err(StorageError::ConflictError("duplicate".to_string())));

        let store = Arc::new(MockStore { progress, writer });
        let processor = BlockProcessor::new(BlockIndexer::new(1, 2), store);

        let err = processor.process_block(&block(1)).unwrap_err();
        assert!(matches!(err, SyncError::Storage(StorageError::ConflictError(_))));
    }
}
