//! Multi-partition search.
//!
//! A key is either a block number, answered from the index alone, or a hex string that is
//! looked up concurrently as a transaction hash or touched unit in the index, as a unit on the
//! partition nodes, and as an owner on the partition nodes.

mod error;
pub use error::SearchError;

mod key;
pub use key::SearchKey;

mod race;
pub use race::first_some;

mod engine;
pub use engine::SearchEngine;
