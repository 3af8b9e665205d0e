//! In-memory storage backend.
//!
//! All tables live behind a single [`RwLock`]. Readers share the lock, every write takes it
//! exclusively, so a block commit is never observed half applied.

use crate::{IndexStorageReader, IndexStorageWriter, ProgressStorage, StorageError};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::trace;
use unitscan_types::{BlockRecord, PartitionId, TxHash, TxRecord, UnitId};

#[derive(Debug, Default)]
struct Tables {
    progress: BTreeMap<PartitionId, u64>,
    blocks: BTreeMap<(PartitionId, u64), BlockRecord>,
    /// Transactions keyed by insertion sequence.
    txs: BTreeMap<u64, TxRecord>,
    /// `(partition_id, insertion_sequence)` of every transaction.
    by_partition: BTreeSet<(PartitionId, u64)>,
    by_record_hash: HashMap<TxHash, u64>,
    by_order_hash: HashMap<TxHash, u64>,
    by_block: HashMap<(PartitionId, u64), Vec<u64>>,
    by_unit: HashMap<(PartitionId, UnitId), BTreeSet<u64>>,
    last_sequence: u64,
}

impl Tables {
    fn insert_block(&mut self, block: &BlockRecord) {
        self.blocks.insert((block.partition_id, block.block_number), block.clone());
    }

    fn insert_tx(&mut self, mut tx: TxRecord) -> Result<u64, StorageError> {
        if let Some(sequence) = self.by_record_hash.get(&tx.tx_record_hash) {
            return Ok(*sequence);
        }
        if self.by_order_hash.contains_key(&tx.tx_order_hash) {
            return Err(StorageError::ConflictError(format!(
                "order hash {} belongs to another transaction",
                tx.tx_order_hash
            )));
        }

        self.last_sequence += 1;
        let sequence = self.last_sequence;
        tx.insertion_sequence = sequence;

        self.by_record_hash.insert(tx.tx_record_hash, sequence);
        self.by_order_hash.insert(tx.tx_order_hash, sequence);
        self.by_partition.insert((tx.partition_id, sequence));
        self.by_block.entry((tx.partition_id, tx.block_number)).or_default().push(sequence);
        for unit_id in &tx.target_unit_ids {
            self.by_unit.entry((tx.partition_id, unit_id.clone())).or_default().insert(sequence);
        }
        self.txs.insert(sequence, tx);

        Ok(sequence)
    }

    fn tx_by_hash(&self, hash: &[u8]) -> Option<&TxRecord> {
        if hash.len() != TxHash::len_bytes() {
            return None;
        }
        let hash = TxHash::from_slice(hash);
        self.by_record_hash
            .get(&hash)
            .or_else(|| self.by_order_hash.get(&hash))
            .and_then(|sequence| self.txs.get(sequence))
    }

    fn unit_sequences(&self, partition_id: PartitionId, unit_id: &[u8]) -> Option<&BTreeSet<u64>> {
        self.by_unit.get(&(partition_id, UnitId::copy_from_slice(unit_id)))
    }
}

/// Storage backend keeping the whole index in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StorageError> {
        self.tables.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StorageError> {
        self.tables.write().map_err(|_| StorageError::LockPoisoned)
    }
}

impl ProgressStorage for InMemoryStore {
    fn get_partition_progress(&self, partition_id: PartitionId) -> Result<u64, StorageError> {
        Ok(self.read()?.progress.get(&partition_id).copied().unwrap_or_default())
    }

    fn set_partition_progress(
        &self,
        partition_id: PartitionId,
        block_number: u64,
    ) -> Result<(), StorageError> {
        self.write()?.progress.insert(partition_id, block_number);
        Ok(())
    }

    fn known_partitions(&self) -> Result<Vec<PartitionId>, StorageError> {
        Ok(self.read()?.progress.keys().copied().collect())
    }
}

impl IndexStorageWriter for InMemoryStore {
    fn put_block(&self, block: &BlockRecord) -> Result<(), StorageError> {
        self.write()?.insert_block(block);
        Ok(())
    }

    fn put_tx(&self, tx: TxRecord) -> Result<u64, StorageError> {
        self.write()?.insert_tx(tx)
    }

    fn commit_block(&self, block: &BlockRecord, txs: Vec<TxRecord>) -> Result<(), StorageError> {
        let mut tables = self.write()?;

        // Check every order hash up front so that a conflict leaves the tables untouched.
        let mut batch = HashMap::with_capacity(txs.len());
        for tx in &txs {
            let owner = tables.by_order_hash.get(&tx.tx_order_hash);
            let stored_conflict =
                owner.is_some() && owner != tables.by_record_hash.get(&tx.tx_record_hash);
            let batch_conflict = batch
                .insert(tx.tx_order_hash, tx.tx_record_hash)
                .is_some_and(|record_hash| record_hash != tx.tx_record_hash);
            if stored_conflict || batch_conflict {
                return Err(StorageError::ConflictError(format!(
                    "order hash {} belongs to another transaction",
                    tx.tx_order_hash
                )));
            }
        }

        let tx_count = txs.len();
        for tx in txs {
            tables.insert_tx(tx)?;
        }
        tables.insert_block(block);
        tables.progress.insert(block.partition_id, block.block_number);

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

impl IndexStorageReader for InMemoryStore {
    fn get_block(
        &self,
        partition_id: PartitionId,
        block_number: u64,
    ) -> Result<Option<BlockRecord>, StorageError> {
        Ok(self.read()?.blocks.get(&(partition_id, block_number)).cloned())
    }

    fn get_blocks_desc(
        &self,
        partition_id: PartitionId,
        from: u64,
        limit: usize,
        include_empty: bool,
    ) -> Result<Vec<BlockRecord>, StorageError> {
        let tables = self.read()?;
        Ok(tables
            .blocks
            .range((partition_id, 0)..=(partition_id, from))
            .rev()
            .map(|(_, block)| block)
            .filter(|block| include_empty || !block.is_empty())
            .take(limit)
            .cloned()
            .collect())
    }

    fn get_tx(&self, hash: &[u8]) -> Result<Option<TxRecord>, StorageError> {
        Ok(self.read()?.tx_by_hash(hash).cloned())
    }

    fn get_txs_desc(
        &self,
        partition_id: PartitionId,
        from: Option<u64>,
        limit: usize,
    ) -> Result<Vec<TxRecord>, StorageError> {
        let tables = self.read()?;
        Ok(tables
            .by_partition
            .range((partition_id, 0)..=(partition_id, from.unwrap_or(u64::MAX)))
            .rev()
            .take(limit)
            .filter_map(|(_, sequence)| tables.txs.get(sequence))
            .cloned()
            .collect())
    }

    fn get_txs_by_block_number(
        &self,
        partition_id: PartitionId,
        block_number: u64,
    ) -> Result<Vec<TxRecord>, StorageError> {
        let tables = self.read()?;
        Ok(tables
            .by_block
            .get(&(partition_id, block_number))
            .into_iter()
            .flatten()
            .filter_map(|sequence| tables.txs.get(sequence))
            .cloned()
            .collect())
    }

    fn get_txs_by_unit_id(
        &self,
        partition_id: PartitionId,
        unit_id: &[u8],
    ) -> Result<Vec<TxRecord>, StorageError> {
        let tables = self.read()?;
        Ok(tables
            .unit_sequences(partition_id, unit_id)
            .into_iter()
            .flat_map(|sequences| sequences.iter().rev())
            .filter_map(|sequence| tables.txs.get(sequence))
            .cloned()
            .collect())
    }

    fn find_txs(
        &self,
        partition_id: PartitionId,
        key: &[u8],
    ) -> Result<Vec<TxRecord>, StorageError> {
        let tables = self.read()?;

        let mut sequences: BTreeSet<u64> = tables
            .unit_sequences(partition_id, key)
            .map(|sequences| sequences.iter().copied().collect())
            .unwrap_or_default();
        if let Some(tx) = tables.tx_by_hash(key).filter(|tx| tx.partition_id == partition_id) {
            sequences.insert(tx.insertion_sequence);
        }

        Ok(sequences.iter().rev().filter_map(|sequence| tables.txs.get(sequence)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use unitscan_types::{B256, Bytes};

    fn block(partition_id: PartitionId, block_number: u64, tx_count: usize) -> BlockRecord {
        BlockRecord { partition_id, block_number, tx_count, ..Default::default() }
    }

    fn tx(partition_id: PartitionId, block_number: u64, seed: u8, units: &[&'static [u8]]) -> TxRecord {
        TxRecord {
            partition_id,
            block_number,
            tx_record_hash: B256::repeat_byte(seed),
            tx_order_hash: B256::repeat_byte(seed.wrapping_add(0x80)),
            target_unit_ids: units.iter().map(|unit| Bytes::from_static(unit)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_progress_defaults_to_zero() {
        let store = InMemoryStore::new();
        assert_eq!(store.get_partition_progress(1).unwrap(), 0);
        assert!(store.known_partitions().unwrap().is_empty());

        store.set_partition_progress(1, 5).unwrap();
        assert_eq!(store.get_partition_progress(1).unwrap(), 5);
        assert_eq!(store.known_partitions().unwrap(), vec![1]);
    }

    #[test]
    fn test_put_tx_is_idempotent() {
        let store = InMemoryStore::new();
        let first = store.put_tx(tx(1, 1, 0x01, &[])).unwrap();
        let second = store.put_tx(tx(1, 1, 0x02, &[])).unwrap();
        let again = store.put_tx(tx(1, 1, 0x01, &[])).unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(again, first);
        assert_eq!(store.get_txs_by_block_number(1, 1).unwrap().len(), 2);
    }

    #[test]
    fn test_tx_resolves_by_either_hash() {
        let store = InMemoryStore::new();
        store.put_tx(tx(1, 1, 0x01, &[])).unwrap();

        let by_record = store.get_tx(B256::repeat_byte(0x01).as_slice()).unwrap().unwrap();
        let by_order = store.get_tx(B256::repeat_byte(0x81).as_slice()).unwrap().unwrap();
        assert_eq!(by_record, by_order);
        assert_eq!(by_record.insertion_sequence, 1);
        assert!(store.get_tx(b"short").unwrap().is_none());
    }

    #[test]
    fn test_commit_block_advances_progress() {
        let store = InMemoryStore::new();
        store.commit_block(&block(1, 1, 2), vec![tx(1, 1, 0x01, &[]), tx(1, 1, 0x02, &[])]).unwrap();

        assert_eq!(store.get_partition_progress(1).unwrap(), 1);
        assert_eq!(store.get_block(1, 1).unwrap().unwrap().tx_count, 2);
        let txs = store.get_txs_by_block_number(1, 1).unwrap();
        assert_eq!(
            txs.iter().map(|tx| tx.tx_record_hash).collect::<Vec<_>>(),
            vec![B256::repeat_byte(0x01), B256::repeat_byte(0x02)]
        );
    }

    #[test]
    fn test_conflicting_commit_leaves_store_unchanged() {
        let store = InMemoryStore::new();
        store.commit_block(&block(1, 1, 1), vec![tx(1, 1, 0x01, &[])]).unwrap();

        let mut conflicting = tx(1, 2, 0x02, &[]);
        conflicting.tx_order_hash = B256::repeat_byte(0x81);
        let err = store.commit_block(&block(1, 2, 1), vec![conflicting]).unwrap_err();

        assert!(matches!(err, StorageError::ConflictError(_)));
        assert_eq!(store.get_partition_progress(1).unwrap(), 1);
        assert!(store.get_block(1, 2).unwrap().is_none());
        assert!(store.get_tx(B256::repeat_byte(0x02).as_slice()).unwrap().is_none());
    }

    #[rstest]
    #[case::include_empty(true, vec![6, 5, 4])]
    #[case::skip_empty(false, vec![6, 4, 2])]
    fn test_blocks_desc_filters_before_counting(
        #[case] include_empty: bool,
        #[case] expected: Vec<u64>,
    ) {
        let store = InMemoryStore::new();
        for number in 1..=6 {
            store.put_block(&block(1, number, usize::from(number % 2 == 0))).unwrap();
        }
        store.put_block(&block(2, 7, 1)).unwrap();

        let numbers: Vec<u64> = store
            .get_blocks_desc(1, 6, 3, include_empty)
            .unwrap()
            .iter()
            .map(|block| block.block_number)
            .collect();
        assert_eq!(numbers, expected);
    }

    #[test]
    fn test_txs_desc_is_scoped_to_partition() {
        let store = InMemoryStore::new();
        store.put_tx(tx(1, 1, 0x01, &[])).unwrap();
        store.put_tx(tx(2, 1, 0x02, &[])).unwrap();
        store.put_tx(tx(1, 2, 0x03, &[])).unwrap();

        let sequences: Vec<u64> =
            store.get_txs_desc(1, None, 10).unwrap().iter().map(|tx| tx.insertion_sequence).collect();
        assert_eq!(sequences, vec![3, 1]);

        let sequences: Vec<u64> = store
            .get_txs_desc(1, Some(2), 10)
            .unwrap()
            .iter()
            .map(|tx| tx.insertion_sequence)
            .collect();
        assert_eq!(sequences, vec![1]);

        let sequences: Vec<u64> =
            store.get_txs_desc(2, None, 10).unwrap().iter().map(|tx| tx.insertion_sequence).collect();
        assert_eq!(sequences, vec![2]);
    }

    #[test]
    fn test_readers_never_observe_partial_commits() {
        crate::test_utils::assert_commits_are_atomic(&InMemoryStore::new());
    }

    #[test]
    fn test_find_txs_matches_hashes_and_units() {
        let store = InMemoryStore::new();
        store.put_tx(tx(1, 1, 0x01, &[b"u1"])).unwrap();
        store.put_tx(tx(1, 2, 0x02, &[b"u1", b"u2"])).unwrap();
        store.put_tx(tx(2, 2, 0x03, &[b"u1"])).unwrap();

        let by_unit = store.find_txs(1, b"u1").unwrap();
        assert_eq!(by_unit.iter().map(|tx| tx.insertion_sequence).collect::<Vec<_>>(), vec![2, 1]);

        let by_order_hash = store.find_txs(1, B256::repeat_byte(0x82).as_slice()).unwrap();
        assert_eq!(by_order_hash.len(), 1);
        assert_eq!(by_order_hash[0].tx_record_hash, B256::repeat_byte(0x02));

        assert!(store.find_txs(2, B256::repeat_byte(0x01).as_slice()).unwrap().is_empty());
        assert_eq!(store.get_txs_by_unit_id(2, b"u1").unwrap().len(), 1);
        assert!(store.get_txs_by_unit_id(1, b"missing").unwrap().is_empty());
    }
}
