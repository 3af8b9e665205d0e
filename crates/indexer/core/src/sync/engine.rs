use crate::{BlockHandler, IndexerError, SyncConfig, SyncError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use unitscan_source::{BlockSource, FetchedBlock};
use unitscan_types::{Block, PartitionId};

/// Synchronises one partition from a [`BlockSource`] into a [`BlockHandler`].
///
/// A run pipelines two tasks over a channel of `batch_size` blocks: the fetcher asks the source
/// for consecutive rounds, the processor hands every fetched block to the handler. The first
/// failure of either task cancels the other and ends the run.
#[derive(Debug)]
pub struct SyncEngine {
    partition_id: PartitionId,
    source: Arc<dyn BlockSource>,
    handler: Arc<dyn BlockHandler>,
    config: SyncConfig,
}

impl SyncEngine {
    /// Creates an engine for the partition served by `source`.
    pub fn new(
        source: Arc<dyn BlockSource>,
        handler: Arc<dyn BlockHandler>,
        config: SyncConfig,
    ) -> Self {
        Self { partition_id: source.partition_id(), source, handler, config }
    }

    /// Runs until `max_block` has been handled, an error occurs or `cancel_token` is cancelled.
    ///
    /// Returns `Ok(())` only when the configured `max_block` was reached.
    pub async fn run(&self, cancel_token: &CancellationToken) -> Result<(), SyncError> {
        self.config.validate()?;

        debug!(
            target: "sync",
            partition_id = self.partition_id,
            start_block = self.config.start_block,
            max_block = ?self.config.max_block,
            "Starting sync"
        );

        let token = cancel_token.child_token();
        let _guard = token.clone().drop_guard();
        let (block_tx, block_rx) = mpsc::channel(self.config.batch_size);

        tokio::try_join!(self.fetch_blocks(block_tx, &token), self.process_blocks(block_rx, &token))?;

        debug!(target: "sync", partition_id = self.partition_id, "Sync reached max block");
        Ok(())
    }

    async fn fetch_blocks(
        &self,
        block_tx: mpsc::Sender<Block>,
        token: &CancellationToken,
    ) -> Result<(), SyncError> {
        let mut round_number = self.config.start_block;

        loop {
            if self.config.max_block.is_some_and(|max_block| round_number > max_block) {
                return Ok(());
            }

            let fetched = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(SyncError::Cancelled),
                fetched = self.source.fetch_block(round_number) => fetched?,
            };

            let block = match fetched {
                FetchedBlock::Available(block) => block,
                FetchedBlock::NotYetAvailable => {
                    let delay = self.config.retry_delay.sample();
                    trace!(
                        target: "sync",
                        partition_id = self.partition_id,
                        round_number,
                        ?delay,
                        "Round not produced yet, waiting"
                    );
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return Err(SyncError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    continue;
                }
            };

            let fetched_round = block.round_number().ok_or(IndexerError::MissingRoundNumber)?;
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(SyncError::Cancelled),
                sent = block_tx.send(block) => {
                    // The processor only hangs up after failing, which ends the run anyway.
                    if sent.is_err() {
                        return Ok(());
                    }
                }
            }
            round_number = fetched_round + 1;
        }
    }

    async fn process_blocks(
        &self,
        mut block_rx: mpsc::Receiver<Block>,
        token: &CancellationToken,
    ) -> Result<(), SyncError> {
        loop {
            let block = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(SyncError::Cancelled),
                block = block_rx.recv() => block,
            };
            let Some(block) = block else {
                return Ok(());
            };

            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(SyncError::Cancelled),
                handled = self.handler.handle_block(block) => handled?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlockIndexer, BlockProcessor, JitteredDelay, MockBlockHandler};
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicU64, Ordering},
        },
        time::Duration,
    };
    use unitscan_source::{MockBlockSource, SourceError};
    use unitscan_storage::{InMemoryStore, IndexStorageReader, ProgressStorage};
    use unitscan_types::UnicityCertificate;

    fn block(round_number: u64) -> Block {
        Block {
            unicity_certificate: Some(UnicityCertificate { round_number, ..Default::default() }),
            ..Default::default()
        }
    }

    fn config(start_block: u64, max_block: Option<u64>) -> SyncConfig {
        SyncConfig {
            start_block,
            max_block,
            batch_size: 2,
            retry_delay: JitteredDelay::fixed(Duration::from_millis(500)),
        }
    }

    /// Source serving every round up to `head`.
    fn source_up_to(head: u64) -> MockBlockSource {
        let mut source = MockBlockSource::new();
        source.expect_partition_id().return_const(1u32);
        source.expect_fetch_block().returning(move |round_number| {
            Ok(if round_number <= head {
                FetchedBlock::Available(block(round_number))
            } else {
                FetchedBlock::NotYetAvailable
            })
        });
        source
    }

    #[derive(Debug, Default)]
    struct RecordingHandler {
        handled: Mutex<Vec<u64>>,
    }

    #[async_trait::async_trait]
    impl BlockHandler for RecordingHandler {
        async fn handle_block(&self, block: Block) -> Result<(), SyncError> {
            self.handled.lock().unwrap().push(block.round_number().unwrap());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_stops_at_max_block() {
        let handler = Arc::new(RecordingHandler::default());
        let engine = SyncEngine::new(Arc::new(source_up_to(10)), handler.clone(), config(1, Some(5)));

        engine.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(*handler.handled.lock().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_run_indexes_into_store() {
        let store = Arc::new(InMemoryStore::new());
        let processor = Arc::new(BlockProcessor::new(BlockIndexer::new(1, 7), store.clone()));
        let engine = SyncEngine::new(Arc::new(source_up_to(3)), processor, config(1, Some(3)));

        engine.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(store.get_partition_progress(1).unwrap(), 3);
        assert_eq!(store.get_block(1, 2).unwrap().unwrap().partition_type_id, 7);
    }

    #[tokio::test]
    async fn test_run_skips_to_next_round_after_fetched_block() {
        let mut source = MockBlockSource::new();
        source.expect_partition_id().return_const(1u32);
        // Round 2 was empty; asking for it yields the block of round 4.
        source.expect_fetch_block().returning(|round_number| {
            Ok(FetchedBlock::Available(block(if round_number == 2 { 4 } else { round_number })))
        });
        let handler = Arc::new(RecordingHandler::default());
        let engine = SyncEngine::new(Arc::new(source), handler.clone(), config(1, Some(6)));

        engine.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(*handler.handled.lock().unwrap(), vec![1, 4, 5, 6]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_rounds_not_yet_available() {
        let calls = Arc::new(AtomicU64::new(0));
        let mut source = MockBlockSource::new();
        source.expect_partition_id().return_const(1u32);
        let counter = calls.clone();
        source.expect_fetch_block().returning(move |round_number| {
            // Round 1 shows up on the third attempt.
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                return Ok(FetchedBlock::NotYetAvailable);
            }
            Ok(FetchedBlock::Available(block(round_number)))
        });
        let handler = Arc::new(RecordingHandler::default());
        let engine = SyncEngine::new(Arc::new(source), handler.clone(), config(1, Some(1)));

        engine.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(*handler.handled.lock().unwrap(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_cancelled() {
        let token = CancellationToken::new();
        let engine = SyncEngine::new(
            Arc::new(source_up_to(0)),
            Arc::new(RecordingHandler::default()),
            config(1, None),
        );

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            canceller.cancel();
        });

        assert!(matches!(engine.run(&token).await, Err(SyncError::Cancelled)));
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_config() {
        let mut source = MockBlockSource::new();
        source.expect_partition_id().return_const(1u32);
        source.expect_fetch_block().never();
        let engine =
            SyncEngine::new(Arc::new(source), Arc::new(RecordingHandler::default()), config(0, None));

        assert!(matches!(
            engine.run(&CancellationToken::new()).await,
            Err(SyncError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_run_stops_on_handler_error() {
        let mut handler = MockBlockHandler::new();
        handler.expect_handle_block().times(1).returning(|_| {
            Err(SyncError::OutOfOrderBlock { partition_id: 1, block_number: 1, last_indexed: 1 })
        });
        let engine = SyncEngine::new(Arc::new(source_up_to(100)), Arc::new(handler), config(1, None));

        assert!(matches!(
            engine.run(&CancellationToken::new()).await,
            Err(SyncError::OutOfOrderBlock { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_stops_on_source_error() {
        let mut source = MockBlockSource::new();
        source.expect_partition_id().return_const(1u32);
        source
            .expect_fetch_block()
            .returning(|_| Err(SourceError::UnexpectedResponse("garbage".to_string())));
        let engine =
            SyncEngine::new(Arc::new(source), Arc::new(RecordingHandler::default()), config(1, None));

        assert!(matches!(engine.run(&CancellationToken::new()).await, Err(SyncError::Source(_))));
    }

    #[tokio::test]
    async fn test_run_rejects_block_without_round() {
        let mut source = MockBlockSource::new();
        source.expect_partition_id().return_const(1u32);
        source.expect_fetch_block().returning(|_| Ok(FetchedBlock::Available(Block::default())));
        let engine =
            SyncEngine::new(Arc::new(source), Arc::new(RecordingHandler::default()), config(1, None));

        assert!(matches!(
            engine.run(&CancellationToken::new()).await,
            Err(SyncError::MalformedBlock(IndexerError::MissingRoundNumber))
        ));
    }
}
