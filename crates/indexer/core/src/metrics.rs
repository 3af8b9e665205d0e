//! Metrics recorded by the indexer.

/// Container for the metric names and their registration.
#[derive(Debug, Clone)]
pub struct Metrics;

impl Metrics {
    /// Blocks committed to the index, per partition.
    pub const BLOCKS_INDEXED_TOTAL: &'static str = "unitscan_blocks_indexed_total";
    /// Transactions committed to the index, per partition.
    pub const TXS_INDEXED_TOTAL: &'static str = "unitscan_txs_indexed_total";
    /// Last indexed block number, per partition.
    pub const PARTITION_PROGRESS: &'static str = "unitscan_partition_progress";
    /// Failed sync runs, per partition.
    pub const SYNC_FAILURES_TOTAL: &'static str = "unitscan_sync_failures_total";
    /// Search requests, by key kind.
    pub const SEARCH_REQUESTS_TOTAL: &'static str = "unitscan_search_requests_total";
    /// Search latency.
    pub const SEARCH_DURATION_SECONDS: &'static str = "unitscan_search_duration_seconds";

    /// Describes and zeroes every metric. Call once after installing a recorder.
    pub fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_counter!(
            Self::BLOCKS_INDEXED_TOTAL,
            metrics::Unit::Count,
            "Total number of blocks committed to the index",
        );

        metrics::describe_counter!(
            Self::TXS_INDEXED_TOTAL,
            metrics::Unit::Count,
            "Total number of transactions committed to the index",
        );

        metrics::describe_gauge!(
            Self::PARTITION_PROGRESS,
            "Number of the last indexed block of a partition",
        );

        metrics::describe_counter!(
            Self::SYNC_FAILURES_TOTAL,
            metrics::Unit::Count,
            "Total number of failed partition sync runs",
        );

        metrics::describe_counter!(
            Self::SEARCH_REQUESTS_TOTAL,
            metrics::Unit::Count,
            "Total number of search requests",
        );

        metrics::describe_histogram!(
            Self::SEARCH_DURATION_SECONDS,
            metrics::Unit::Seconds,
            "Latency of search requests",
        );
    }

    fn zero() {
        metrics::counter!(Self::SEARCH_REQUESTS_TOTAL, "kind" => "block_number").increment(0);

        metrics::counter!(Self::SEARCH_REQUESTS_TOTAL, "kind" => "hex").increment(0);

        metrics::histogram!(Self::SEARCH_DURATION_SECONDS,).record(0.0);
    }
}
