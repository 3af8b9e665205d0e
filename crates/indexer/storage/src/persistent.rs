//! RocksDB storage backend.
//!
//! Every table is a column family with big-endian keys, so iteration order follows partition
//! and number order. A block commit is a single [`WriteBatch`]: readers see the transactions,
//! the block and the new progress together or not at all.

use crate::{IndexStorageReader, IndexStorageWriter, ProgressStorage, StorageError};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::{Serialize, de::DeserializeOwned};
use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fmt,
    path::Path,
    sync::{Mutex, MutexGuard},
};
use tracing::{debug, trace};
use unitscan_types::{BlockRecord, PartitionId, TxHash, TxRecord};

/// Partition id to last indexed block number.
const CF_PROGRESS: &str = "progress";
/// `(partition_id, block_number)` to [`BlockRecord`].
const CF_BLOCKS: &str = "blocks";
/// `(partition_id, insertion_sequence)` to [`TxRecord`].
const CF_TXS: &str = "txs";
/// Record hash to the key of the transaction in [`CF_TXS`].
const CF_TX_RECORD_HASHES: &str = "tx_record_hashes";
/// Order hash to the key of the transaction in [`CF_TXS`].
const CF_TX_ORDER_HASHES: &str = "tx_order_hashes";
/// `(partition_id, block_number, insertion_sequence)`, no value.
const CF_BLOCK_TXS: &str = "block_txs";
/// `(partition_id, unit_id, insertion_sequence)`, no value.
const CF_UNIT_TXS: &str = "unit_txs";
/// Store wide counters.
const CF_META: &str = "meta";

const COLUMN_FAMILIES: [&str; 8] = [
    CF_PROGRESS,
    CF_BLOCKS,
    CF_TXS,
    CF_TX_RECORD_HASHES,
    CF_TX_ORDER_HASHES,
    CF_BLOCK_TXS,
    CF_UNIT_TXS,
    CF_META,
];

const LAST_SEQUENCE_KEY: &[u8] = b"last_sequence";

/// `partition_id ++ number`, the key layout shared by blocks and transactions.
fn partition_key(partition_id: PartitionId, number: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(12);
    key.extend_from_slice(&partition_id.to_be_bytes());
    key.extend_from_slice(&number.to_be_bytes());
    key
}

fn block_tx_key(partition_id: PartitionId, block_number: u64, sequence: u64) -> Vec<u8> {
    let mut key = partition_key(partition_id, block_number);
    key.extend_from_slice(&sequence.to_be_bytes());
    key
}

/// The unit id is length prefixed so that no unit id is a key prefix of another.
fn unit_prefix(partition_id: PartitionId, unit_id: &[u8]) -> Result<Vec<u8>, StorageError> {
    let len = u32::try_from(unit_id.len())
        .map_err(|_| StorageError::Codec(format!("unit id of {} bytes", unit_id.len())))?;
    let mut key = Vec::with_capacity(8 + unit_id.len() + 8);
    key.extend_from_slice(&partition_id.to_be_bytes());
    key.extend_from_slice(&len.to_be_bytes());
    key.extend_from_slice(unit_id);
    Ok(key)
}

/// Reads the big-endian `u64` closing a key or value.
fn trailing_u64(bytes: &[u8]) -> Result<u64, StorageError> {
    bytes
        .len()
        .checked_sub(8)
        .and_then(|start| <[u8; 8]>::try_from(&bytes[start..]).ok())
        .map(u64::from_be_bytes)
        .ok_or_else(|| StorageError::Codec(format!("expected a u64 suffix in {} bytes", bytes.len())))
}

fn leading_partition_id(bytes: &[u8]) -> Result<PartitionId, StorageError> {
    bytes
        .get(..4)
        .and_then(|head| <[u8; 4]>::try_from(head).ok())
        .map(PartitionId::from_be_bytes)
        .ok_or_else(|| StorageError::Codec(format!("expected a partition id in {} bytes", bytes.len())))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    Ok(serde_json::from_slice(bytes)?)
}

fn cf_handle<'a>(db: &'a DB, name: &'static str) -> Result<&'a ColumnFamily, StorageError> {
    db.cf_handle(name).ok_or(StorageError::ColumnFamilyNotFound(name))
}

/// Transactions staged in one write batch.
#[derive(Debug)]
struct PendingTxs {
    last_sequence: u64,
    sequences: HashMap<TxHash, u64>,
    order_hashes: HashSet<TxHash>,
}

impl PendingTxs {
    fn new(last_sequence: u64) -> Self {
        Self { last_sequence, sequences: HashMap::new(), order_hashes: HashSet::new() }
    }
}

/// Storage backend persisting the index in a RocksDB database.
pub struct RocksDbStore {
    db: DB,
    /// Serializes writers. Holds the last assigned insertion sequence.
    last_sequence: Mutex<u64>,
}

impl fmt::Debug for RocksDbStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RocksDbStore").field("path", &self.db.path()).finish_non_exhaustive()
    }
}

impl RocksDbStore {
    /// Opens the database at `path`, creating it and its column families if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));
        let db = DB::open_cf_descriptors(&db_opts, path, descriptors)?;

        let last_sequence = match db.get_cf(cf_handle(&db, CF_META)?, LAST_SEQUENCE_KEY)? {
            Some(bytes) => trailing_u64(&bytes)?,
            None => 0,
        };
        debug!(
            target: "storage",
            path = %db.path().display(),
            last_sequence,
            "Opened index database"
        );

        Ok(Self { db, last_sequence: Mutex::new(last_sequence) })
    }

    fn cf(&self, name: &'static str) -> Result<&ColumnFamily, StorageError> {
        cf_handle(&self.db, name)
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, u64>, StorageError> {
        self.last_sequence.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Adds `tx` to `batch` unless it is already stored or staged. Returns its sequence.
    fn stage_tx(
        &self,
        batch: &mut WriteBatch,
        pending: &mut PendingTxs,
        mut tx: TxRecord,
    ) -> Result<u64, StorageError> {
        if let Some(tx_key) = self.db.get_cf(self.cf(CF_TX_RECORD_HASHES)?, tx.tx_record_hash)? {
            return trailing_u64(&tx_key);
        }
        if let Some(sequence) = pending.sequences.get(&tx.tx_record_hash) {
            return Ok(*sequence);
        }
        if pending.order_hashes.contains(&tx.tx_order_hash) ||
            self.db.get_cf(self.cf(CF_TX_ORDER_HASHES)?, tx.tx_order_hash)?.is_some()
        {
            return Err(StorageError::ConflictError(format!(
                "order hash {} belongs to another transaction",
                tx.tx_order_hash
            )));
        }

        pending.last_sequence += 1;
        let sequence = pending.last_sequence;
        tx.insertion_sequence = sequence;

        let tx_key = partition_key(tx.partition_id, sequence);
        batch.put_cf(self.cf(CF_TXS)?, &tx_key, encode(&tx)?);
        batch.put_cf(self.cf(CF_TX_RECORD_HASHES)?, tx.tx_record_hash, &tx_key);
        batch.put_cf(self.cf(CF_TX_ORDER_HASHES)?, tx.tx_order_hash, &tx_key);
        batch.put_cf(
            self.cf(CF_BLOCK_TXS)?,
            block_tx_key(tx.partition_id, tx.block_number, sequence),
            b"",
        );
        for unit_id in &tx.target_unit_ids {
            let mut unit_key = unit_prefix(tx.partition_id, unit_id)?;
            unit_key.extend_from_slice(&sequence.to_be_bytes());
            batch.put_cf(self.cf(CF_UNIT_TXS)?, unit_key, b"");
        }

        pending.sequences.insert(tx.tx_record_hash, sequence);
        pending.order_hashes.insert(tx.tx_order_hash);
        Ok(sequence)
    }

    /// Writes `batch` together with the new last sequence and publishes the sequence.
    fn write_batch(
        &self,
        mut batch: WriteBatch,
        pending: PendingTxs,
        last_sequence: &mut MutexGuard<'_, u64>,
    ) -> Result<(), StorageError> {
        batch.put_cf(self.cf(CF_META)?, LAST_SEQUENCE_KEY, pending.last_sequence.to_be_bytes());
        self.db.write(batch)?;
        **last_sequence = pending.last_sequence;
        Ok(())
    }

    fn tx_at(&self, tx_key: &[u8]) -> Result<Option<TxRecord>, StorageError> {
        self.db.get_cf(self.cf(CF_TXS)?, tx_key)?.map(|bytes| decode(&bytes)).transpose()
    }

    fn tx_by_hash(&self, hash: &[u8]) -> Result<Option<TxRecord>, StorageError> {
        if hash.len() != TxHash::len_bytes() {
            return Ok(None);
        }
        let tx_key = match self.db.get_cf(self.cf(CF_TX_RECORD_HASHES)?, hash)? {
            Some(tx_key) => Some(tx_key),
            None => self.db.get_cf(self.cf(CF_TX_ORDER_HASHES)?, hash)?,
        };
        match tx_key {
            Some(tx_key) => self.tx_at(&tx_key),
            None => Ok(None),
        }
    }

    /// Insertion sequences of the keys in `cf` starting with `prefix`, ascending.
    fn sequences_with_prefix(
        &self,
        cf: &'static str,
        prefix: &[u8],
    ) -> Result<Vec<u64>, StorageError> {
        let mut sequences = vec![];
        for item in self.db.prefix_iterator_cf(self.cf(cf)?, prefix) {
            let (key, _) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            sequences.push(trailing_u64(&key)?);
        }
        Ok(sequences)
    }

    fn txs_at(
        &self,
        partition_id: PartitionId,
        sequences: impl IntoIterator<Item = u64>,
    ) -> Result<Vec<TxRecord>, StorageError> {
        let mut txs = vec![];
        for sequence in sequences {
            if let Some(tx) = self.tx_at(&partition_key(partition_id, sequence))? {
                txs.push(tx);
            }
        }
        Ok(txs)
    }
}

impl ProgressStorage for RocksDbStore {
    fn get_partition_progress(&self, partition_id: PartitionId) -> Result<u64, StorageError> {
        match self.db.get_cf(self.cf(CF_PROGRESS)?, partition_id.to_be_bytes())? {
            Some(bytes) => trailing_u64(&bytes),
            None => Ok(0),
        }
    }

    fn set_partition_progress(
        &self,
        partition_id: PartitionId,
        block_number: u64,
    ) -> Result<(), StorageError> {
        self.db.put_cf(
            self.cf(CF_PROGRESS)?,
            partition_id.to_be_bytes(),
            block_number.to_be_bytes(),
        )?;
        Ok(())
    }

    fn known_partitions(&self) -> Result<Vec<PartitionId>, StorageError> {
        let mut partitions = vec![];
        for item in self.db.iterator_cf(self.cf(CF_PROGRESS)?, IteratorMode::Start) {
            let (key, _) = item?;
            partitions.push(leading_partition_id(&key)?);
        }
        Ok(partitions)
    }
}

impl IndexStorageWriter for RocksDbStore {
    fn put_block(&self, block: &BlockRecord) -> Result<(), StorageError> {
        self.db.put_cf(
            self.cf(CF_BLOCKS)?,
            partition_key(block.partition_id, block.block_number),
            encode(block)?,
        )?;
        Ok(())
    }

    fn put_tx(&self, tx: TxRecord) -> Result<u64, StorageError> {
        let mut last_sequence = self.lock_writer()?;
        let mut batch = WriteBatch::default();
        let mut pending = PendingTxs::new(*last_sequence);

        let sequence = self.stage_tx(&mut batch, &mut pending, tx)?;
        self.write_batch(batch, pending, &mut last_sequence)?;
        Ok(sequence)
    }

    fn commit_block(&self, block: &BlockRecord, txs: Vec<TxRecord>) -> Result<(), StorageError> {
        let mut last_sequence = self.lock_writer()?;
        let mut batch = WriteBatch::default();
        let mut pending = PendingTxs::new(*last_sequence);

        let tx_count = txs.len();
        for tx in txs {
            self.stage_tx(&mut batch, &mut pending, tx)?;
        }
        batch.put_cf(
            self.cf(CF_BLOCKS)?,
            partition_key(block.partition_id, block.block_number),
            encode(block)?,
        );
        batch.put_cf(
            self.cf(CF_PROGRESS)?,
            block.partition_id.to_be_bytes(),
            block.block_number.to_be_bytes(),
        );
        self.write_batch(batch, pending, &mut last_sequence)?;

        trace!(
            target: "storage",
            partition_id = block.partition_id,
            block_number = block.block_number,
            tx_count,
            "Committed block"
        );
        Ok(())
    }
}

impl IndexStorageReader for RocksDbStore {
    fn get_block(
        &self,
        partition_id: PartitionId,
        block_number: u64,
    ) -> Result<Option<BlockRecord>, StorageError> {
        self.db
            .get_cf(self.cf(CF_BLOCKS)?, partition_key(partition_id, block_number))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn get_blocks_desc(
        &self,
        partition_id: PartitionId,
        from: u64,
        limit: usize,
        include_empty: bool,
    ) -> Result<Vec<BlockRecord>, StorageError> {
        let start = partition_key(partition_id, from);
        let prefix = partition_id.to_be_bytes();

        let mut blocks = vec![];
        let iter = self
            .db
            .iterator_cf(self.cf(CF_BLOCKS)?, IteratorMode::From(start.as_slice(), Direction::Reverse));
        for item in iter {
            if blocks.len() == limit {
                break;
            }
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let block: BlockRecord = decode(&value)?;
            if include_empty || !block.is_empty() {
                blocks.push(block);
            }
        }
        Ok(blocks)
    }

    fn get_tx(&self, hash: &[u8]) -> Result<Option<TxRecord>, StorageError> {
        self.tx_by_hash(hash)
    }

    fn get_txs_desc(
        &self,
        partition_id: PartitionId,
        from: Option<u64>,
        limit: usize,
    ) -> Result<Vec<TxRecord>, StorageError> {
        let start = partition_key(partition_id, from.unwrap_or(u64::MAX));
        let prefix = partition_id.to_be_bytes();

        let mut txs = vec![];
        let iter =
            self.db.iterator_cf(self.cf(CF_TXS)?, IteratorMode::From(start.as_slice(), Direction::Reverse));
        for item in iter {
            if txs.len() == limit {
                break;
            }
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            txs.push(decode(&value)?);
        }
        Ok(txs)
    }

    fn get_txs_by_block_number(
        &self,
        partition_id: PartitionId,
        block_number: u64,
    ) -> Result<Vec<TxRecord>, StorageError> {
        let prefix = partition_key(partition_id, block_number);
        let sequences = self.sequences_with_prefix(CF_BLOCK_TXS, &prefix)?;
        self.txs_at(partition_id, sequences)
    }

    fn get_txs_by_unit_id(
        &self,
        partition_id: PartitionId,
        unit_id: &[u8],
    ) -> Result<Vec<TxRecord>, StorageError> {
        let prefix = unit_prefix(partition_id, unit_id)?;
        let sequences = self.sequences_with_prefix(CF_UNIT_TXS, &prefix)?;
        self.txs_at(partition_id, sequences.into_iter().rev())
    }

    fn find_txs(
        &self,
        partition_id: PartitionId,
        key: &[u8],
    ) -> Result<Vec<TxRecord>, StorageError> {
        let prefix = unit_prefix(partition_id, key)?;
        let mut sequences: BTreeSet<u64> =
            self.sequences_with_prefix(CF_UNIT_TXS, &prefix)?.into_iter().collect();
        if let Some(tx) = self.tx_by_hash(key)?.filter(|tx| tx.partition_id == partition_id) {
            sequences.insert(tx.insertion_sequence);
        }
        self.txs_at(partition_id, sequences.into_iter().rev())
    }
}
