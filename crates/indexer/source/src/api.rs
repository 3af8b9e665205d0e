//! [`PartitionStateApi`] contains the endpoints a partition node exposes for reading its state.

use jsonrpsee::{core::RpcResult, proc_macros::rpc};
use unitscan_types::{Block, Bytes, RoundInfo, Unit};

/// Using the proc_macro to generate the client code.
/// Default namespace separator is `_`.
#[cfg_attr(not(test), rpc(client, namespace = "state"))]
#[cfg_attr(test, rpc(client, server, namespace = "state"))]
pub trait PartitionStateApi {
    /// Returns the block of the given round, `None` while it has not been produced.
    #[method(name = "getBlock")]
    async fn get_block(&self, round_number: u64) -> RpcResult<Option<Block>>;

    /// Returns the latest round information.
    #[method(name = "getRoundInfo")]
    async fn get_round_info(&self) -> RpcResult<RoundInfo>;

    /// Returns the current state of a unit, `None` if the partition does not hold it.
    #[method(name = "getUnit")]
    async fn get_unit(&self, unit_id: Bytes, include_state_proof: bool) -> RpcResult<Option<Unit>>;

    /// Returns the identifiers of the units owned by `owner_id`.
    #[method(name = "getUnitsByOwnerID")]
    async fn get_units_by_owner_id(&self, owner_id: Bytes) -> RpcResult<Vec<Bytes>>;
}
