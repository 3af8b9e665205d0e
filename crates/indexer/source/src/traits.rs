use crate::SourceError;
use async_trait::async_trait;
use std::fmt::Debug;
use unitscan_types::{Block, PartitionId, RoundInfo, Unit, UnitId};

/// Outcome of fetching a block by round number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedBlock {
    /// The partition produced the block.
    Available(Block),
    /// The partition has not produced a block for the round yet.
    NotYetAvailable,
}

/// Per-partition connection to a node that serves blocks and unit state.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait BlockSource: Debug + Send + Sync {
    /// The partition this source serves.
    fn partition_id(&self) -> PartitionId;

    /// Fetches the block of `round_number`.
    ///
    /// A round the partition has not reached yet is reported as
    /// [`FetchedBlock::NotYetAvailable`], never as an error.
    async fn fetch_block(&self, round_number: u64) -> Result<FetchedBlock, SourceError>;

    /// Fetches the latest round information.
    async fn fetch_round_info(&self) -> Result<RoundInfo, SourceError>;

    /// Fetches the current state of a unit, `None` if the partition does not hold it.
    async fn fetch_unit(
        &self,
        unit_id: &[u8],
        include_proof: bool,
    ) -> Result<Option<Unit>, SourceError>;

    /// Fetches the identifiers of the units owned by `owner_id`.
    async fn fetch_units_by_owner(&self, owner_id: &[u8]) -> Result<Vec<UnitId>, SourceError>;
}
