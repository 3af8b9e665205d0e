//! Contains the indexer CLI.

use crate::{
    flags::{GlobalArgs, IndexerArgs},
    telemetry::{init_prometheus_server, init_tracing_subscriber},
};
use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use unitscan_core::{PartitionSupervisor, QueryService};
use unitscan_rpc::ExplorerRpc;
use unitscan_storage::{InMemoryStore, IndexStorage, RocksDbStore};

/// Indexes the blocks of several partitions and serves them over JSON-RPC.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Global arguments for the CLI.
    #[command(flatten)]
    pub global: GlobalArgs,
    /// Indexer arguments.
    #[command(flatten)]
    pub indexer: IndexerArgs,
}

impl Cli {
    /// Runs the CLI.
    pub(crate) fn run(self) -> Result<()> {
        init_tracing_subscriber(self.global.verbosity)?;
        if let Some(addr) = self.global.metrics_socket() {
            init_prometheus_server(addr)?;
        }

        Self::tokio_runtime()
            .context("failed to build the tokio runtime")?
            .block_on(self.start())
    }

    /// Opens the configured store, then indexes and serves until ctrl-c is pressed.
    async fn start(self) -> Result<()> {
        if self.indexer.in_memory {
            warn!(target: "storage", "Keeping the index in memory, it is lost on shutdown");
            return self.serve(Arc::new(InMemoryStore::new())).await;
        }

        let datadir = &self.indexer.datadir;
        let store = RocksDbStore::open(datadir)
            .with_context(|| format!("failed to open the index at {}", datadir.display()))?;
        info!(target: "storage", datadir = %datadir.display(), "Opened index database");
        self.serve(Arc::new(store)).await
    }

    async fn serve<S: IndexStorage + 'static>(self, store: Arc<S>) -> Result<()> {
        let registry = self.indexer.build_registry()?;
        let supervisor_config = self.indexer.supervisor_config()?;
        let cancel_token = CancellationToken::new();

        let rpc = ExplorerRpc::new(
            QueryService::new(store.clone()),
            registry.clone(),
            cancel_token.clone(),
        );
        let (rpc_addr, rpc_handle) = rpc
            .launch(self.indexer.rpc_socket())
            .await
            .context("failed to start the explorer RPC server")?;
        info!(target: "rpc", %rpc_addr, "Explorer RPC server started");

        let supervisor =
            PartitionSupervisor::new(registry, store, supervisor_config, cancel_token.clone());
        let supervisor_task = tokio::spawn(async move { supervisor.run().await });

        tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
        info!("Received ctrl-c, shutting down");

        cancel_token.cancel();
        if let Err(err) = supervisor_task.await {
            error!(target: "supervisor", %err, "Supervisor task failed");
        }
        if rpc_handle.stop().is_ok() {
            rpc_handle.stopped().await;
        }
        Ok(())
    }

    /// Creates a new default tokio multi-thread [Runtime](tokio::runtime::Runtime) with all
    /// features enabled.
    fn tokio_runtime() -> Result<tokio::runtime::Runtime, std::io::Error> {
        tokio::runtime::Builder::new_multi_thread().enable_all().build()
    }
}
