//! Raw block types as delivered by a partition's RPC endpoint.

use crate::{PartitionId, TransactionRecord};
use alloy_primitives::{B256, Bytes};
use serde::{Deserialize, Serialize};

/// Header metadata of a raw block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    /// The partition that produced the block.
    pub partition_id: PartitionId,
    /// The shard of the partition that produced the block.
    pub shard_id: Bytes,
    /// Identifier of the validator that proposed the block.
    pub proposer_id: String,
    /// Hash of the previous block of the partition.
    pub previous_block_hash: Bytes,
}

/// Certificate proving that a block was finalized.
///
/// Only the fields the indexer needs are decoded; the full certificate is kept in `raw`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnicityCertificate {
    /// Round in which the block was certified.
    pub round_number: u64,
    /// Epoch in which the block was certified.
    pub epoch: u64,
    /// Root hash of the certifying round.
    pub root_hash: B256,
    /// The complete certificate in its encoded form.
    pub raw: Bytes,
}

/// A block fetched from a partition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Header metadata.
    pub header: BlockHeader,
    /// Executed transactions in block order.
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,
    /// Finality proof of the block, carrying its round number.
    pub unicity_certificate: Option<UnicityCertificate>,
}

impl Block {
    /// Returns the round number of the block, or `None` when the block carries no certificate
    /// or the certificate has no round.
    pub fn round_number(&self) -> Option<u64> {
        self.unicity_certificate.as_ref().map(|uc| uc.round_number).filter(|round| *round > 0)
    }
}

/// Latest round information of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundInfo {
    /// The latest round number.
    pub round_number: u64,
    /// The current epoch.
    pub epoch: u64,
}
