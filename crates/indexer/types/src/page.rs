use crate::{BlockRecord, TxRecord};
use serde::{Deserialize, Serialize};

/// A page of blocks walking towards the first block of a partition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlocksPage {
    /// Blocks in descending number order.
    pub blocks: Vec<BlockRecord>,
    /// Block number to start the next page at, `0` once the first block was reached.
    pub prev_block_number: u64,
}

/// A page of transactions in descending insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxsPage {
    /// Transactions, newest first.
    pub txs: Vec<TxRecord>,
    /// Cursor of the next page, `None` when this page is the last one.
    pub previous_id: Option<u64>,
}
