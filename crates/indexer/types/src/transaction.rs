//! Raw transaction types.
//!
//! A [`TransactionRecord`] is what a block stores for every executed transaction: the order
//! exactly as the client submitted it, plus the metadata the partition attached while executing
//! it. The order is kept in its encoded form so that its hash can be recomputed byte for byte.

use crate::{PartitionId, TxHash, UnitId, sha256};
use alloy_primitives::Bytes;
use alloy_rlp::{Decodable, Encodable, RlpDecodable, RlpEncodable};
use serde::{Deserialize, Serialize};

/// The part of a transaction order that describes what should be executed.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    /// The partition the order is addressed to.
    pub partition_id: PartitionId,
    /// The unit the order operates on.
    pub unit_id: UnitId,
    /// The transaction type, interpreted by the partition.
    pub tx_type: u16,
    /// Type specific attributes.
    pub attributes: Bytes,
    /// Client supplied metadata (timeout, max fee, fee credit reference).
    pub client_metadata: Bytes,
}

/// A transaction order as submitted by a client.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOrder {
    /// What to execute.
    pub payload: Payload,
    /// Proof that the owner of the unit authorized the order.
    pub auth_proof: Bytes,
    /// Proof that the fee payer authorized the fee.
    pub fee_proof: Bytes,
}

impl TransactionOrder {
    /// Decodes an order from its encoded form.
    pub fn decode_from(mut encoded: &[u8]) -> alloy_rlp::Result<Self> {
        let order = Self::decode(&mut encoded)?;
        if !encoded.is_empty() {
            return Err(alloy_rlp::Error::UnexpectedLength);
        }
        Ok(order)
    }

    /// Returns the encoded form of the order.
    pub fn encoded(&self) -> Bytes {
        alloy_rlp::encode(self).into()
    }
}

/// Metadata attached by the partition while executing a transaction.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
#[serde(rename_all = "camelCase")]
pub struct ServerMetadata {
    /// Fee charged for the execution.
    pub actual_fee: u64,
    /// Every unit modified by the execution.
    pub target_units: Vec<UnitId>,
    /// Execution outcome, `1` for success.
    pub success_indicator: u8,
    /// Partition specific execution details.
    pub processing_details: Bytes,
}

/// An executed transaction as stored in a block.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// The encoded [`TransactionOrder`].
    pub transaction_order: Bytes,
    /// Execution metadata.
    pub server_metadata: ServerMetadata,
}

impl TransactionRecord {
    /// Hash of the record form: the digest of the encoded record.
    pub fn record_hash(&self) -> TxHash {
        let mut buf = Vec::with_capacity(self.length());
        self.encode(&mut buf);
        sha256(buf)
    }

    /// Hash of the order form: the digest of the encoded order, as the client computed it.
    pub fn order_hash(&self) -> TxHash {
        sha256(&self.transaction_order)
    }

    /// Decodes the embedded [`TransactionOrder`].
    pub fn order(&self) -> alloy_rlp::Result<TransactionOrder> {
        TransactionOrder::decode_from(&self.transaction_order)
    }
}
