use crate::IndexerError;
use unitscan_types::{
    Block, BlockRecord, PartitionId, PartitionTypeId, TransactionRecord, TxRecord, UnitId,
};

/// Derives index records from the raw blocks of a single partition.
///
/// Indexing is pure: the same block always yields the same records, and nothing is written.
/// Insertion sequences are left at zero for the store to assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockIndexer {
    partition_id: PartitionId,
    partition_type_id: PartitionTypeId,
}

impl BlockIndexer {
    /// Creates an indexer for the blocks of `partition_id`.
    pub const fn new(partition_id: PartitionId, partition_type_id: PartitionTypeId) -> Self {
        Self { partition_id, partition_type_id }
    }

    /// The partition this indexer serves.
    pub const fn partition_id(&self) -> PartitionId {
        self.partition_id
    }

    /// Turns a raw block into its [`BlockRecord`] and one [`TxRecord`] per transaction, in
    /// block order.
    ///
    /// # Errors
    /// Fails when the block has no round number or one of its orders cannot be decoded.
    pub fn index(&self, block: &Block) -> Result<(BlockRecord, Vec<TxRecord>), IndexerError> {
        let block_number = block.round_number().ok_or(IndexerError::MissingRoundNumber)?;

        let txs = block
            .transactions
            .iter()
            .enumerate()
            .map(|(index, tx)| self.index_tx(block_number, index, tx))
            .collect::<Result<Vec<_>, _>>()?;

        let record = BlockRecord {
            partition_id: self.partition_id,
            partition_type_id: self.partition_type_id,
            block_number,
            shard_id: block.header.shard_id.clone(),
            proposer_id: block.header.proposer_id.clone(),
            previous_block_hash: block.header.previous_block_hash.clone(),
            tx_hashes: txs.iter().map(|tx| tx.tx_record_hash).collect(),
            unicity_certificate: block
                .unicity_certificate
                .as_ref()
                .map(|uc| uc.raw.clone())
                .unwrap_or_default(),
            tx_count: txs.len(),
        };

        Ok((record, txs))
    }

    fn index_tx(
        &self,
        block_number: u64,
        index: usize,
        tx: &TransactionRecord,
    ) -> Result<TxRecord, IndexerError> {
        let order = tx.order().map_err(|source| IndexerError::MalformedTransaction { index, source })?;

        let mut target_unit_ids: Vec<UnitId> =
            Vec::with_capacity(1 + tx.server_metadata.target_units.len());
        for unit_id in std::iter::once(&order.payload.unit_id).chain(&tx.server_metadata.target_units)
        {
            if !target_unit_ids.contains(unit_id) {
                target_unit_ids.push(unit_id.clone());
            }
        }

        Ok(TxRecord {
            partition_id: self.partition_id,
            block_number,
            tx_record_hash: tx.record_hash(),
            tx_order_hash: tx.order_hash(),
            target_unit_ids,
            transaction: tx.clone(),
            insertion_sequence: 0,
        })
    }
}
