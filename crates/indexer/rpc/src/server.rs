//! Server-side implementation of the [`ExplorerApiServer`].

use crate::{ExplorerApiServer, RpcError};
use async_trait::async_trait;
use jsonrpsee::{core::RpcResult, server::ServerHandle};
use std::{collections::BTreeMap, net::SocketAddr};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};
use unitscan_core::{PartitionRegistry, QueryService, SearchEngine};
use unitscan_storage::{IndexStorageReader, ProgressStorage};
use unitscan_types::{
    BlockRecord, BlocksPage, Bytes, PartitionId, RoundInfo, SearchResult, TxRecord, TxsPage,
};

/// Answers `explorer` requests from the index and the partition nodes.
#[derive(Debug)]
pub struct ExplorerRpc<S> {
    query: QueryService<S>,
    search: SearchEngine<S>,
    registry: PartitionRegistry,
    cancel_token: CancellationToken,
}

impl<S> ExplorerRpc<S>
where
    S: IndexStorageReader + ProgressStorage + 'static,
{
    /// Creates the handler. Searches in flight are cancelled together with `cancel_token`.
    pub fn new(
        query: QueryService<S>,
        registry: PartitionRegistry,
        cancel_token: CancellationToken,
    ) -> Self {
        let search = SearchEngine::new(registry.clone(), query.clone());
        Self { query, search, registry, cancel_token }
    }

    /// Starts serving on `addr`. Returns the bound address with the server's handle.
    pub async fn launch(self, addr: SocketAddr) -> std::io::Result<(SocketAddr, ServerHandle)> {
        let server = jsonrpsee::server::ServerBuilder::default().build(addr).await?;
        let local_addr = server.local_addr()?;
        trace!(target: "rpc", %local_addr, "Serving explorer API");
        Ok((local_addr, server.start(self.into_rpc())))
    }
}

#[async_trait]
impl<S> ExplorerApiServer for ExplorerRpc<S>
where
    S: IndexStorageReader + ProgressStorage + 'static,
{
    async fn get_block(
        &self,
        block_number: u64,
        partition_ids: Option<Vec<PartitionId>>,
    ) -> RpcResult<BTreeMap<PartitionId, BlockRecord>> {
        trace!(target: "rpc", block_number, ?partition_ids, "Received getBlock request");
        let blocks = self
            .query
            .get_block(block_number, &partition_ids.unwrap_or_default())
            .map_err(RpcError::from)?;
        if blocks.is_empty() {
            return Err(RpcError::NotFound.into());
        }
        Ok(blocks)
    }

    async fn get_last_blocks(
        &self,
        partition_ids: Option<Vec<PartitionId>>,
        count: usize,
        include_empty: bool,
    ) -> RpcResult<BTreeMap<PartitionId, Vec<BlockRecord>>> {
        trace!(target: "rpc", ?partition_ids, count, include_empty, "Received getLastBlocks request");
        Ok(self
            .query
            .get_last_blocks(&partition_ids.unwrap_or_default(), count, include_empty)
            .map_err(RpcError::from)?)
    }

    async fn get_blocks_in_range(
        &self,
        partition_id: PartitionId,
        start_block: u64,
        count: usize,
        include_empty: bool,
    ) -> RpcResult<BlocksPage> {
        trace!(target: "rpc", partition_id, start_block, count, "Received getBlocksInRange request");
        Ok(self
            .query
            .get_blocks_in_range(partition_id, start_block, count, include_empty)
            .map_err(RpcError::from)?)
    }

    async fn get_txs_page(
        &self,
        partition_id: PartitionId,
        start: Option<u64>,
        limit: usize,
    ) -> RpcResult<TxsPage> {
        trace!(target: "rpc", partition_id, ?start, limit, "Received getTxsPage request");
        Ok(self.query.get_txs_page(partition_id, start, limit).map_err(RpcError::from)?)
    }

    async fn get_tx(&self, hash: Bytes) -> RpcResult<TxRecord> {
        trace!(target: "rpc", %hash, "Received getTx request");
        let tx = self.query.get_tx(&hash).map_err(RpcError::from)?;
        Ok(tx.ok_or(RpcError::NotFound)?)
    }

    async fn get_txs_by_block_number(
        &self,
        partition_id: PartitionId,
        block_number: u64,
    ) -> RpcResult<Vec<TxRecord>> {
        trace!(target: "rpc", partition_id, block_number, "Received getTxsByBlockNumber request");
        Ok(self.query.get_txs_by_block_number(partition_id, block_number).map_err(RpcError::from)?)
    }

    async fn get_txs_by_unit_id(
        &self,
        partition_id: PartitionId,
        unit_id: Bytes,
    ) -> RpcResult<Vec<TxRecord>> {
        trace!(target: "rpc", partition_id, %unit_id, "Received getTxsByUnitId request");
        Ok(self.query.get_txs_by_unit_id(partition_id, &unit_id).map_err(RpcError::from)?)
    }

    async fn get_round_info(&self, partition_id: PartitionId) -> RpcResult<RoundInfo> {
        trace!(target: "rpc", partition_id, "Received getRoundInfo request");
        let round_info = self.registry.round_info(partition_id).await.ok_or(RpcError::NotFound)?;
        Ok(round_info.map_err(|err| {
            warn!(target: "rpc", partition_id, %err, "Round info lookup failed");
            RpcError::from(err)
        })?)
    }

    async fn search(
        &self,
        key: String,
        partition_ids: Option<Vec<PartitionId>>,
    ) -> RpcResult<SearchResult> {
        trace!(target: "rpc", %key, ?partition_ids, "Received search request");
        let token = self.cancel_token.child_token();
        let result = self
            .search
            .search(&token, &key, &partition_ids.unwrap_or_default())
            .await
            .map_err(RpcError::from)?;
        if result.is_empty() {
            return Err(RpcError::NotFound.into());
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExplorerApiClient;
    use jsonrpsee::{
        core::ClientError,
        http_client::{HttpClient, HttpClientBuilder},
    };
    use std::sync::Arc;
    use unitscan_source::MockBlockSource;
    use unitscan_storage::{InMemoryStore, IndexStorageWriter};
    use unitscan_types::B256;

    fn tx(block_number: u64, tag: u8) -> TxRecord {
        TxRecord {
            partition_id: 1,
            block_number,
            tx_record_hash: B256::repeat_byte(tag),
            tx_order_hash: B256::with_last_byte(tag),
            target_unit_ids: vec![Bytes::from_static(b"u1")],
            ..Default::default()
        }
    }

    fn block(block_number: u64, tx_count: usize) -> BlockRecord {
        BlockRecord { partition_id: 1, block_number, tx_count, ..Default::default() }
    }

    async fn serve() -> (HttpClient, ServerHandle) {
        let store = Arc::new(InMemoryStore::new());
        store.commit_block(&block(1, 0), vec![]).unwrap();
        store.commit_block(&block(2, 2), vec![tx(2, 1), tx(2, 2)]).unwrap();

        let mut source = MockBlockSource::new();
        source.expect_partition_id().return_const(1u32);
        source.expect_fetch_round_info().returning(|| Ok(RoundInfo { round_number: 9, epoch: 2 }));
        source.expect_fetch_unit().returning(|_, _| Ok(None));
        source.expect_fetch_units_by_owner().returning(|_| Ok(vec![]));
        let registry = PartitionRegistry::builder().with_partition(3, Arc::new(source)).build();

        let rpc = ExplorerRpc::new(QueryService::new(store), registry, CancellationToken::new());
        let (addr, handle) = rpc.launch("127.0.0.1:0".parse().unwrap()).await.unwrap();
        (HttpClientBuilder::default().build(format!("http://{addr}")).unwrap(), handle)
    }

    fn error_code(err: ClientError) -> i32 {
        match err {
            ClientError::Call(err) => err.code(),
            other => panic!("unexpected client error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_block_endpoints() {
        let (client, _handle) = serve().await;

        let blocks = client.get_block(2, None).await.unwrap();
        assert_eq!(blocks[&1].tx_count, 2);
        assert_eq!(error_code(client.get_block(3, None).await.unwrap_err()), -32001);

        let last = client.get_last_blocks(Some(vec![1]), 5, false).await.unwrap();
        assert_eq!(last[&1].len(), 1);
        assert_eq!(error_code(client.get_last_blocks(None, 0, true).await.unwrap_err()), -32602);

        let page = client.get_blocks_in_range(1, 2, 1, true).await.unwrap();
        assert_eq!(page.prev_block_number, 1);
        assert_eq!(error_code(client.get_blocks_in_range(1, 2, 0, true).await.unwrap_err()), -32602);
    }

    #[tokio::test]
    async fn test_tx_endpoints() {
        let (client, _handle) = serve().await;

        let page = client.get_txs_page(1, None, 1).await.unwrap();
        assert_eq!(page.txs.len(), 1);
        assert!(page.previous_id.is_some());

        let hash = Bytes::copy_from_slice(B256::with_last_byte(1).as_slice());
        assert_eq!(client.get_tx(hash).await.unwrap().block_number, 2);
        let unknown = Bytes::copy_from_slice(B256::ZERO.as_slice());
        assert_eq!(error_code(client.get_tx(unknown).await.unwrap_err()), -32001);

        assert_eq!(client.get_txs_by_block_number(1, 2).await.unwrap().len(), 2);
        assert!(client.get_txs_by_block_number(1, 1).await.unwrap().is_empty());
        assert_eq!(client.get_txs_by_unit_id(1, Bytes::from_static(b"u1")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_round_info() {
        let (client, _handle) = serve().await;

        assert_eq!(client.get_round_info(1).await.unwrap().round_number, 9);
        assert_eq!(error_code(client.get_round_info(5).await.unwrap_err()), -32001);
    }

    #[tokio::test]
    async fn test_search() {
        let (client, _handle) = serve().await;

        let result = client.search("2".to_string(), None).await.unwrap();
        assert_eq!(result.blocks[&1].block_number, 2);

        let result = client.search("0x7531".to_string(), None).await.unwrap();
        assert_eq!(result.txs.len(), 2);

        assert_eq!(error_code(client.search("0xbeef".to_string(), None).await.unwrap_err()), -32001);
        assert_eq!(error_code(client.search("nothex".to_string(), None).await.unwrap_err()), -32602);
    }
}
