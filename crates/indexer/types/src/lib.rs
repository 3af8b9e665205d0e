//! Core types shared across unitscan components.
//!
//! This crate defines the raw block and transaction types delivered by a partition's RPC
//! endpoint, and the normalized index records derived from them.

mod block;
pub use block::{Block, BlockHeader, RoundInfo, UnicityCertificate};

mod transaction;
pub use transaction::{Payload, ServerMetadata, TransactionOrder, TransactionRecord};

mod record;
pub use record::{BlockRecord, TxRecord};

mod unit;
pub use unit::Unit;

mod search;
pub use search::SearchResult;

mod page;
pub use page::{BlocksPage, TxsPage};

mod hash;
pub use hash::sha256;

pub use alloy_primitives::{B256, Bytes, hex};

/// Identifier of an independently sequenced partition (chain or shard).
pub type PartitionId = u32;

/// Identifier of the kind of a partition (money, tokens, ...).
pub type PartitionTypeId = u32;

/// Opaque identifier of a unit (the state object a transaction targets).
pub type UnitId = Bytes;

/// Digest identifying a transaction, either by its record form or its order form.
pub type TxHash = B256;
