use crate::{
    Metrics, PartitionRegistry, QueryService, RegisteredPartition, SearchError, SearchKey,
    first_some,
};
use futures::future::join_all;
use std::{collections::BTreeMap, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use unitscan_storage::{IndexStorageReader, ProgressStorage};
use unitscan_types::{PartitionId, SearchResult, TxRecord, Unit, UnitId};

/// Resolves free-text keys across the index and the partition nodes.
#[derive(Debug, Clone)]
pub struct SearchEngine<S> {
    registry: PartitionRegistry,
    query: QueryService<S>,
}

impl<S> SearchEngine<S>
where
    S: IndexStorageReader + ProgressStorage + 'static,
{
    /// Creates a search engine over the partitions of `registry`.
    pub const fn new(registry: PartitionRegistry, query: QueryService<S>) -> Self {
        Self { registry, query }
    }

    /// Searches `raw_key` in the requested partitions, or in every registered partition when
    /// none are given. Unknown partitions are skipped.
    ///
    /// A decimal key is only looked up as a block number and fails with
    /// [`SearchError::NotFound`] when no partition has the block. Any other key must be hex; it
    /// is looked up concurrently as a transaction hash or touched unit in the index, as a unit
    /// id on the partition nodes and, when it has the shape of a public key hash, as an owner
    /// id. The returned result may be empty.
    pub async fn search(
        &self,
        cancel_token: &CancellationToken,
        raw_key: &str,
        partition_ids: &[PartitionId],
    ) -> Result<SearchResult, SearchError> {
        let started = Instant::now();
        let key = SearchKey::parse(raw_key)?;
        metrics::counter!(Metrics::SEARCH_REQUESTS_TOTAL, "kind" => key.kind()).increment(1);

        let partitions = self.registry.select(partition_ids);
        debug!(target: "search", ?key, partitions = partitions.len(), "Searching");

        let result = match key {
            SearchKey::BlockNumber(block_number) => self.search_block(block_number, &partitions),
            SearchKey::Bytes(ref bytes) => {
                let (txs, unit, units_by_partition) = tokio::join!(
                    self.find_txs(&partitions, bytes),
                    self.find_unit(cancel_token, &partitions, bytes),
                    async {
                        if key.is_owner_candidate() {
                            self.find_owned_units(cancel_token, &partitions, bytes).await
                        } else {
                            BTreeMap::new()
                        }
                    },
                );

                if cancel_token.is_cancelled() {
                    return Err(SearchError::Cancelled);
                }
                txs.map(|txs| SearchResult { txs, unit, units_by_partition, ..Default::default() })
            }
        };

        metrics::histogram!(Metrics::SEARCH_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        result
    }

    fn search_block(
        &self,
        block_number: u64,
        partitions: &[RegisteredPartition],
    ) -> Result<SearchResult, SearchError> {
        if partitions.is_empty() {
            return Err(SearchError::NotFound);
        }

        let partition_ids: Vec<_> = partitions.iter().map(|p| p.partition_id).collect();
        let blocks = self.query.get_block(block_number, &partition_ids)?;
        if blocks.is_empty() {
            return Err(SearchError::NotFound);
        }
        Ok(SearchResult { blocks, ..Default::default() })
    }

    /// Index lookup in every partition on the blocking pool, merged in partition order.
    async fn find_txs(
        &self,
        partitions: &[RegisteredPartition],
        key: &[u8],
    ) -> Result<Vec<TxRecord>, SearchError> {
        let lookups = partitions.iter().map(|partition| {
            let query = self.query.clone();
            let partition_id = partition.partition_id;
            let key = key.to_vec();
            tokio::task::spawn_blocking(move || query.find_txs(partition_id, &key))
        });

        let mut txs = vec![];
        for found in join_all(lookups).await {
            let found = found.map_err(|err| SearchError::LookupAborted(err.to_string()))?;
            txs.extend(found?);
        }
        Ok(txs)
    }

    /// Asks every partition node for the unit, keeping the first that has it.
    async fn find_unit(
        &self,
        cancel_token: &CancellationToken,
        partitions: &[RegisteredPartition],
        unit_id: &[u8],
    ) -> Option<Unit> {
        let branches = partitions.iter().map(|partition| {
            let source = partition.source.clone();
            let branch =
                move |_: CancellationToken| async move { source.fetch_unit(unit_id, false).await };
            (partition.partition_id, branch)
        });
        first_some(cancel_token, branches).await
    }

    /// Asks every partition node for the units of the owner and merges the answers.
    async fn find_owned_units(
        &self,
        cancel_token: &CancellationToken,
        partitions: &[RegisteredPartition],
        owner_id: &[u8],
    ) -> BTreeMap<PartitionId, Vec<UnitId>> {
        let lookups = partitions.iter().map(|partition| async move {
            let result = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => return None,
                result = partition.source.fetch_units_by_owner(owner_id) => result,
            };

            match result {
                Ok(units) if !units.is_empty() => Some((partition.partition_id, units)),
                Ok(_) => None,
                Err(err) => {
                    warn!(
                        target: "search",
                        partition_id = partition.partition_id,
                        %err,
                        "Owner lookup failed"
                    );
                    None
                }
            }
        });

        join_all(lookups).await.into_iter().flatten().collect()
    }
}
