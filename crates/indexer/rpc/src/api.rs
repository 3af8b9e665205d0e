use jsonrpsee::{core::RpcResult, proc_macros::rpc};
use std::collections::BTreeMap;
use unitscan_types::{
    BlockRecord, BlocksPage, Bytes, PartitionId, RoundInfo, SearchResult, TxRecord, TxsPage,
};

/// Read API of the indexer.
#[cfg_attr(not(test), rpc(server, namespace = "explorer"))]
#[cfg_attr(test, rpc(server, client, namespace = "explorer"))]
pub trait ExplorerApi {
    /// Returns a block of every requested partition that has it, of every known partition when
    /// none are requested.
    #[method(name = "getBlock")]
    async fn get_block(
        &self,
        block_number: u64,
        partition_ids: Option<Vec<PartitionId>>,
    ) -> RpcResult<BTreeMap<PartitionId, BlockRecord>>;

    /// Returns the most recent blocks of every requested partition, newest first.
    #[method(name = "getLastBlocks")]
    async fn get_last_blocks(
        &self,
        partition_ids: Option<Vec<PartitionId>>,
        count: usize,
        include_empty: bool,
    ) -> RpcResult<BTreeMap<PartitionId, Vec<BlockRecord>>>;

    /// Returns a page of blocks of a partition, walking towards its first block.
    #[method(name = "getBlocksInRange")]
    async fn get_blocks_in_range(
        &self,
        partition_id: PartitionId,
        start_block: u64,
        count: usize,
        include_empty: bool,
    ) -> RpcResult<BlocksPage>;

    /// Returns a page of transactions of a partition, newest first.
    #[method(name = "getTxsPage")]
    async fn get_txs_page(
        &self,
        partition_id: PartitionId,
        start: Option<u64>,
        limit: usize,
    ) -> RpcResult<TxsPage>;

    /// Returns a transaction by record hash or order hash.
    #[method(name = "getTx")]
    async fn get_tx(&self, hash: Bytes) -> RpcResult<TxRecord>;

    /// Returns the transactions of a block.
    #[method(name = "getTxsByBlockNumber")]
    async fn get_txs_by_block_number(
        &self,
        partition_id: PartitionId,
        block_number: u64,
    ) -> RpcResult<Vec<TxRecord>>;

    /// Returns the transactions that touched a unit, newest first.
    #[method(name = "getTxsByUnitId")]
    async fn get_txs_by_unit_id(
        &self,
        partition_id: PartitionId,
        unit_id: Bytes,
    ) -> RpcResult<Vec<TxRecord>>;

    /// Returns the latest round of a partition as reported by its node.
    #[method(name = "getRoundInfo")]
    async fn get_round_info(&self, partition_id: PartitionId) -> RpcResult<RoundInfo>;

    /// Searches a block number, transaction hash, unit id or owner id.
    #[method(name = "search")]
    async fn search(
        &self,
        key: String,
        partition_ids: Option<Vec<PartitionId>>,
    ) -> RpcResult<SearchResult>;
}
