use crate::{PartitionId, UnitId};
use alloy_primitives::Bytes;
use serde::{Deserialize, Serialize};

/// Snapshot of a unit's current state as reported by its partition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    /// The partition that holds the unit.
    pub partition_id: PartitionId,
    /// Identifier of the unit.
    pub unit_id: UnitId,
    /// Encoded unit data, interpreted by the partition.
    pub data: Bytes,
    /// Proof of the unit's state, present only when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_proof: Option<Bytes>,
}
