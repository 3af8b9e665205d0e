use crate::{BlockRecord, PartitionId, TxRecord, Unit, UnitId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregated answer of a search. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Blocks found per partition.
    pub blocks: BTreeMap<PartitionId, BlockRecord>,
    /// Transactions whose hash or target unit matched the key.
    pub txs: Vec<TxRecord>,
    /// Units owned by the key, per partition.
    pub units_by_partition: BTreeMap<PartitionId, Vec<UnitId>>,
    /// The unit identified by the key, if any partition reported it.
    pub unit: Option<Unit>,
}

impl SearchResult {
    /// Returns `true` when nothing matched.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
            && self.txs.is_empty()
            && self.units_by_partition.values().all(Vec::is_empty)
            && self.unit.is_none()
    }
}
