//! HTTP JSON-RPC implementation of [`BlockSource`].

use crate::{BlockSource, FetchedBlock, PartitionStateApiClient, SourceError};
use async_trait::async_trait;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use std::time::Duration;
use tracing::trace;
use unitscan_types::{Bytes, PartitionId, RoundInfo, Unit, UnitId};
use url::Url;

/// Builder for [`RpcBlockSource`].
#[derive(Debug, Clone)]
pub struct RpcBlockSourceBuilder {
    partition_id: PartitionId,
    url: Url,
    timeout: Duration,
}

impl RpcBlockSourceBuilder {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a builder for the node of `partition_id` reachable at `url`.
    pub const fn new(partition_id: PartitionId, url: Url) -> Self {
        Self { partition_id, url, timeout: Self::DEFAULT_TIMEOUT }
    }

    /// Sets the request timeout.
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the [`RpcBlockSource`].
    pub fn build(self) -> Result<RpcBlockSource, SourceError> {
        let client = HttpClientBuilder::default()
            .request_timeout(self.timeout)
            .build(self.url.as_str())
            .map_err(|e| SourceError::ClientBuild(e.to_string()))?;

        Ok(RpcBlockSource { partition_id: self.partition_id, url: self.url, client })
    }
}

/// [`BlockSource`] talking to a partition node over HTTP JSON-RPC.
#[derive(Clone, Debug)]
pub struct RpcBlockSource {
    partition_id: PartitionId,
    url: Url,
    client: HttpClient,
}

impl RpcBlockSource {
    /// Returns a builder for the node of `partition_id` reachable at `url`.
    pub const fn builder(partition_id: PartitionId, url: Url) -> RpcBlockSourceBuilder {
        RpcBlockSourceBuilder::new(partition_id, url)
    }

    /// The node's endpoint.
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl BlockSource for RpcBlockSource {
    fn partition_id(&self) -> PartitionId {
        self.partition_id
    }

    async fn fetch_block(&self, round_number: u64) -> Result<FetchedBlock, SourceError> {
        let Some(block) = self.client.get_block(round_number).await? else {
            trace!(target: "source", partition_id = self.partition_id, round_number, "Block not produced yet");
            return Ok(FetchedBlock::NotYetAvailable);
        };

        if block.header.partition_id != self.partition_id {
            return Err(SourceError::UnexpectedResponse(format!(
                "requested a block of partition {}, received one of partition {}",
                self.partition_id, block.header.partition_id
            )));
        }
        Ok(FetchedBlock::Available(block))
    }

    async fn fetch_round_info(&self) -> Result<RoundInfo, SourceError> {
        Ok(self.client.get_round_info().await?)
    }

    async fn fetch_unit(
        &self,
        unit_id: &[u8],
        include_proof: bool,
    ) -> Result<Option<Unit>, SourceError> {
        let unit = self.client.get_unit(Bytes::copy_from_slice(unit_id), include_proof).await?;
        Ok(unit.map(|unit| Unit { partition_id: self.partition_id, ..unit }))
    }

    async fn fetch_units_by_owner(&self, owner_id: &[u8]) -> Result<Vec<UnitId>, SourceError> {
        Ok(self.client.get_units_by_owner_id(Bytes::copy_from_slice(owner_id)).await?)
    }
}
