//! Normalized index records derived from raw blocks.

use crate::{PartitionId, PartitionTypeId, TransactionRecord, TxHash, UnitId};
use alloy_primitives::Bytes;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// An indexed block.
///
/// Immutable once written and uniquely keyed by `(partition_id, block_number)`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[display("partition: {partition_id}, block: {block_number}, txs: {tx_count}")]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    /// The partition the block belongs to.
    pub partition_id: PartitionId,
    /// The kind of the partition.
    pub partition_type_id: PartitionTypeId,
    /// Round number of the block.
    pub block_number: u64,
    /// Shard of the partition that produced the block.
    pub shard_id: Bytes,
    /// Validator that proposed the block.
    pub proposer_id: String,
    /// Hash of the previous block.
    pub previous_block_hash: Bytes,
    /// Record hashes of the contained transactions, in block order.
    pub tx_hashes: Vec<TxHash>,
    /// The encoded unicity certificate.
    pub unicity_certificate: Bytes,
    /// Number of transactions in the block.
    pub tx_count: usize,
}

impl BlockRecord {
    /// Returns `true` when the block contains no transactions.
    pub const fn is_empty(&self) -> bool {
        self.tx_count == 0
    }
}

/// An indexed transaction.
///
/// Keyed by `tx_record_hash`; `tx_order_hash` resolves to the same record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[display("partition: {partition_id}, block: {block_number}, tx: {tx_record_hash}")]
#[serde(rename_all = "camelCase")]
pub struct TxRecord {
    /// The partition the transaction was executed in.
    pub partition_id: PartitionId,
    /// The block containing the transaction.
    pub block_number: u64,
    /// Hash of the record form.
    pub tx_record_hash: TxHash,
    /// Hash of the order form.
    pub tx_order_hash: TxHash,
    /// Every unit the transaction touched, in first-seen order.
    pub target_unit_ids: Vec<UnitId>,
    /// The raw record as found in the block.
    pub transaction: TransactionRecord,
    /// Store assigned, monotonically increasing insertion position. Zero until stored.
    pub insertion_sequence: u64,
}
