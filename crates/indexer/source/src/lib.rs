//! Block source contract and JSON-RPC client for partition nodes.
//!
//! A [`BlockSource`] is the per-partition connection the indexer pulls blocks from and the
//! search engine asks about units. [`RpcBlockSource`] implements it over HTTP JSON-RPC.

mod error;
pub use error::SourceError;

mod traits;
#[cfg(any(test, feature = "test-utils"))]
pub use traits::MockBlockSource;
pub use traits::{BlockSource, FetchedBlock};

mod api;
pub use api::PartitionStateApiClient;
#[cfg(test)]
pub(crate) use api::PartitionStateApiServer;

mod client;
pub use client::{RpcBlockSource, RpcBlockSourceBuilder};
