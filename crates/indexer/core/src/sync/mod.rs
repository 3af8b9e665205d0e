//! Per-partition block synchronisation.
//!
//! A [`SyncEngine`] pipelines a block fetcher and a block processor for one partition. The
//! fetcher walks the partition's rounds and hands blocks to the processor over a bounded
//! channel; the processor passes them to a [`BlockHandler`], normally a [`BlockProcessor`]
//! that indexes and commits them.

mod config;
pub use config::SyncConfig;

mod error;
pub use error::SyncError;

mod engine;
pub use engine::SyncEngine;

mod processor;
#[cfg(test)]
pub use processor::MockBlockHandler;
pub use processor::{BlockHandler, BlockProcessor};
