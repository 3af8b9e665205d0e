//! Block indexing module for turning raw blocks into index records.
//!
//! - [`BlockIndexer`] derives a [`BlockRecord`](unitscan_types::BlockRecord) and its
//!   [`TxRecord`](unitscan_types::TxRecord)s from a raw block.
//! - [`IndexerError`] reports blocks whose records cannot be derived.

mod error;
pub use error::IndexerError;

mod indexer;
pub use indexer::BlockIndexer;
