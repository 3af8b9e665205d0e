//! Core services of unitscan.
//!
//! - [`BlockIndexer`] derives index records from raw blocks.
//! - [`SyncEngine`] pipelines fetching and processing the blocks of one partition, and
//!   [`PartitionSupervisor`] keeps one sync worker per registered partition alive.
//! - [`QueryService`] answers point and paginated reads from the index.
//! - [`SearchEngine`] resolves free-text keys across the index and the partition nodes.

mod backoff;
pub use backoff::JitteredDelay;

mod indexer;
pub use indexer::{BlockIndexer, IndexerError};

mod sync;
#[cfg(test)]
pub use sync::MockBlockHandler;
pub use sync::{BlockHandler, BlockProcessor, SyncConfig, SyncEngine, SyncError};

mod supervisor;
pub use supervisor::{PartitionSupervisor, SupervisorConfig};

mod registry;
pub use registry::{PartitionRegistry, PartitionRegistryBuilder, RegisteredPartition};

mod query;
pub use query::{QueryError, QueryService};

mod search;
pub use search::{SearchEngine, SearchError, SearchKey, first_some};

mod metrics;
pub use metrics::Metrics;
