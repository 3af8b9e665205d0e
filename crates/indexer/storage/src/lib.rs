//! Storage contract and backends for the unitscan index.
//!
//! The index keeps one progress counter per partition, one record per block and one record per
//! transaction. Transactions are reachable by their record hash, their order hash and by every
//! unit they touched.
//!
//! - [`ProgressStorage`], [`IndexStorageWriter`] and [`IndexStorageReader`] describe the contract.
//! - [`RocksDbStore`] persists the index in a RocksDB database.
//! - [`InMemoryStore`] is a backend that keeps everything behind a single lock.

mod error;
pub use error::StorageError;

mod traits;
pub use traits::{IndexStorage, IndexStorageReader, IndexStorageWriter, ProgressStorage};
#[cfg(any(test, feature = "test-utils"))]
pub use traits::{MockIndexStorageReader, MockIndexStorageWriter, MockProgressStorage};

mod persistent;
pub use persistent::RocksDbStore;

mod memory;
pub use memory::InMemoryStore;

#[cfg(test)]
mod test_utils;
