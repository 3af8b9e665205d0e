use crate::flags::PartitionArg;
use anyhow::{Context, Result, bail};
use clap::Args;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use tracing::info;
use unitscan_core::{JitteredDelay, PartitionRegistry, SupervisorConfig, SyncConfig};
use unitscan_source::RpcBlockSource;

/// Indexer configuration arguments.
#[derive(Args, Clone, Debug)]
pub(crate) struct IndexerArgs {
    /// Partitions to index, as `<partition-id>:<partition-type-id>=<node-url>`.
    #[arg(
        long = "partition",
        env = "UNITSCAN_PARTITIONS",
        value_delimiter = ',',
        required = true
    )]
    pub partitions: Vec<PartitionArg>,

    /// Directory of the index database.
    #[arg(long, env = "UNITSCAN_DATADIR", default_value = "unitscan-data")]
    pub datadir: PathBuf,

    /// Keep the index in memory instead of `--datadir`. Nothing survives a restart.
    #[arg(long = "storage.in-memory", env = "UNITSCAN_STORAGE_IN_MEMORY")]
    pub in_memory: bool,

    /// Request timeout towards partition nodes, in seconds.
    #[arg(long = "source.timeout-secs", env = "UNITSCAN_SOURCE_TIMEOUT_SECS", default_value_t = 30)]
    pub source_timeout_secs: u64,

    /// Number of fetched blocks buffered ahead of processing, per partition.
    #[arg(long = "sync.batch-size", env = "UNITSCAN_SYNC_BATCH_SIZE", default_value_t = SyncConfig::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Last block to index per partition. Indexing never stops when unset.
    #[arg(long = "sync.max-block", env = "UNITSCAN_SYNC_MAX_BLOCK")]
    pub max_block: Option<u64>,

    /// Lower bound of the delay before restarting a failed partition sync, in seconds.
    #[arg(long = "supervisor.backoff-min-secs", env = "UNITSCAN_BACKOFF_MIN_SECS", default_value_t = 10)]
    pub backoff_min_secs: u64,

    /// Upper bound of the delay before restarting a failed partition sync, in seconds.
    #[arg(long = "supervisor.backoff-max-secs", env = "UNITSCAN_BACKOFF_MAX_SECS", default_value_t = 20)]
    pub backoff_max_secs: u64,

    /// IP address for the explorer RPC server to listen on.
    #[arg(long = "rpc.addr", env = "UNITSCAN_RPC_ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub rpc_address: IpAddr,

    /// Port for the explorer RPC server to listen on.
    #[arg(long = "rpc.port", env = "UNITSCAN_RPC_PORT", default_value_t = 8545)]
    pub rpc_port: u16,
}

impl IndexerArgs {
    /// Connects a source to every configured partition.
    pub(crate) fn build_registry(&self) -> Result<PartitionRegistry> {
        let timeout = Duration::from_secs(self.source_timeout_secs);
        let mut builder = PartitionRegistry::builder();
        for partition in &self.partitions {
            let source = RpcBlockSource::builder(partition.partition_id, partition.url.clone())
                .timeout(timeout)
                .build()
                .with_context(|| {
                    format!("failed to connect to partition {} at {}", partition.partition_id, partition.url)
                })?;
            info!(
                target: "source",
                partition_id = partition.partition_id,
                url = %source.url(),
                "Registered partition"
            );
            builder = builder.with_partition(partition.partition_type_id, Arc::new(source));
        }
        Ok(builder.build())
    }

    /// Builds the supervisor configuration.
    pub(crate) fn supervisor_config(&self) -> Result<SupervisorConfig> {
        if self.batch_size == 0 {
            bail!("--sync.batch-size must be at least 1");
        }
        let Some(backoff) = JitteredDelay::new(
            Duration::from_secs(self.backoff_min_secs),
            Duration::from_secs(self.backoff_max_secs),
        ) else {
            bail!("--supervisor.backoff-min-secs must not exceed --supervisor.backoff-max-secs");
        };

        Ok(SupervisorConfig {
            batch_size: self.batch_size,
            max_block: self.max_block,
            backoff,
            ..Default::default()
        })
    }

    /// The socket for the explorer RPC server.
    pub(crate) const fn rpc_socket(&self) -> SocketAddr {
        SocketAddr::new(self.rpc_address, self.rpc_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        indexer: IndexerArgs,
    }

    fn parse(args: &[&str]) -> IndexerArgs {
        TestCli::try_parse_from(std::iter::once("unitscan").chain(args.iter().copied()))
            .unwrap()
            .indexer
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--partition", "1:1=http://localhost:1"]);
        let config = args.supervisor_config().unwrap();

        assert_eq!(config.batch_size, SyncConfig::DEFAULT_BATCH_SIZE);
        assert_eq!(config.max_block, None);
        assert_eq!(config.backoff.min(), Duration::from_secs(10));
        assert_eq!(config.backoff.max(), Duration::from_secs(20));
        assert_eq!(args.rpc_socket().port(), 8545);
        assert_eq!(args.datadir, PathBuf::from("unitscan-data"));
        assert!(!args.in_memory);
    }

    #[test]
    fn test_storage_flags() {
        let args = parse(&[
            "--partition",
            "1:1=http://localhost:1",
            "--datadir",
            "/tmp/unitscan",
            "--storage.in-memory",
        ]);

        assert_eq!(args.datadir, PathBuf::from("/tmp/unitscan"));
        assert!(args.in_memory);
    }

    #[tokio::test]
    async fn test_partitions_accept_delimited_list() {
        let args = parse(&["--partition", "1:1=http://a:1,2:5=http://b:2", "--sync.max-block", "9"]);

        assert_eq!(args.partitions.len(), 2);
        assert_eq!(args.partitions[1].partition_type_id, 5);
        assert_eq!(args.supervisor_config().unwrap().max_block, Some(9));

        let registry = args.build_registry().unwrap();
        assert_eq!(registry.partition_ids(), vec![1, 2]);
    }

    #[test]
    fn test_partition_is_required() {
        assert!(TestCli::try_parse_from(["unitscan"]).is_err());
    }

    #[test]
    fn test_invalid_supervisor_config() {
        let args = parse(&[
            "--partition",
            "1:1=http://a:1",
            "--supervisor.backoff-min-secs",
            "30",
            "--supervisor.backoff-max-secs",
            "20",
        ]);
        assert!(args.supervisor_config().is_err());

        let args = parse(&["--partition", "1:1=http://a:1", "--sync.batch-size", "0"]);
        assert!(args.supervisor_config().is_err());
    }
}
