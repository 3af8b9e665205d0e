//! Supervision of one sync worker per registered partition.

use crate::{
    BlockIndexer, BlockProcessor, JitteredDelay, Metrics, PartitionRegistry, RegisteredPartition,
    SyncConfig, SyncEngine, SyncError,
};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use unitscan_storage::IndexStorage;

/// Configuration of the [`PartitionSupervisor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Channel capacity of every sync run.
    pub batch_size: usize,
    /// Last round to index per partition, unbounded when `None`.
    pub max_block: Option<u64>,
    /// Delay before restarting a failed sync run.
    pub backoff: JitteredDelay,
    /// Delay before asking again for a round that was not produced yet.
    pub retry_delay: JitteredDelay,
}

impl SupervisorConfig {
    /// Default lower bound of the restart backoff.
    pub const DEFAULT_BACKOFF_MIN: Duration = Duration::from_secs(10);
    /// Default upper bound of the restart backoff.
    pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(20);
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        let sync = SyncConfig::default();
        Self {
            batch_size: sync.batch_size,
            max_block: None,
            backoff: JitteredDelay::new(Self::DEFAULT_BACKOFF_MIN, Self::DEFAULT_BACKOFF_MAX)
                .unwrap_or(JitteredDelay::fixed(Self::DEFAULT_BACKOFF_MIN)),
            retry_delay: sync.retry_delay,
        }
    }
}

/// Keeps every registered partition syncing.
///
/// Each partition gets its own worker. A worker resumes from the partition's stored progress,
/// and restarts after a randomized backoff whenever a run fails. Failures are never fatal to
/// the supervisor or to other partitions.
#[derive(Debug)]
pub struct PartitionSupervisor<S> {
    registry: PartitionRegistry,
    store: Arc<S>,
    config: SupervisorConfig,
    cancel_token: CancellationToken,
}

impl<S> PartitionSupervisor<S>
where
    S: IndexStorage + 'static,
{
    /// Creates a supervisor for the partitions in `registry`.
    pub const fn new(
        registry: PartitionRegistry,
        store: Arc<S>,
        config: SupervisorConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        Self { registry, store, config, cancel_token }
    }

    /// Runs the workers until all of them stop.
    ///
    /// Workers stop when the cancellation token fires, or once `max_block` is indexed.
    pub async fn run(&self) {
        let mut workers = JoinSet::new();
        for partition in self.registry.iter() {
            info!(
                target: "supervisor",
                partition_id = partition.partition_id,
                partition_type_id = partition.partition_type_id,
                "Starting partition worker"
            );
            workers.spawn(Self::supervise(
                partition.clone(),
                self.store.clone(),
                self.config,
                self.cancel_token.clone(),
            ));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                error!(target: "supervisor", %err, "Partition worker panicked");
            }
        }
        info!(target: "supervisor", "All partition workers stopped");
    }

    async fn supervise(
        partition: RegisteredPartition,
        store: Arc<S>,
        config: SupervisorConfig,
        cancel_token: CancellationToken,
    ) {
        let partition_id = partition.partition_id;
        let processor = Arc::new(BlockProcessor::new(
            BlockIndexer::new(partition_id, partition.partition_type_id),
            store.clone(),
        ));

        loop {
            let result = match store.get_partition_progress(partition_id) {
                Ok(progress) => {
                    let engine = SyncEngine::new(
                        partition.source.clone(),
                        processor.clone(),
                        SyncConfig {
                            start_block: progress + 1,
                            max_block: config.max_block,
                            batch_size: config.batch_size,
                            retry_delay: config.retry_delay,
                        },
                    );
                    engine.run(&cancel_token).await
                }
                Err(err) => Err(SyncError::from(err)),
            };

            match result {
                Ok(()) => {
                    info!(target: "supervisor", partition_id, "Partition reached max block");
                    return;
                }
                Err(_) if cancel_token.is_cancelled() => {
                    info!(target: "supervisor", partition_id, "Partition worker cancelled");
                    return;
                }
                Err(err) => {
                    let delay = config.backoff.sample();
                    error!(
                        target: "supervisor",
                        partition_id,
                        %err,
                        ?delay,
                        "Partition sync failed, restarting after backoff"
                    );
                    metrics::counter!(
                        Metrics::SYNC_FAILURES_TOTAL,
                        "partition_id" => partition_id.to_string()
                    )
                    .increment(1);

                    tokio::select! {
                        _ = cancel_token.cancelled() => {
                            warn!(target: "supervisor", partition_id, "Cancelled during backoff");
                            return;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}
