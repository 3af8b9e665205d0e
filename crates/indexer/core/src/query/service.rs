use crate::QueryError;
use std::{collections::BTreeMap, sync::Arc};
use unitscan_storage::{IndexStorageReader, ProgressStorage};
use unitscan_types::{BlockRecord, BlocksPage, PartitionId, TxRecord, TxsPage};

/// Answers read requests from the index.
#[derive(Debug)]
pub struct QueryService<S> {
    store: Arc<S>,
}

impl<S> Clone for QueryService<S> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone() }
    }
}

impl<S> QueryService<S>
where
    S: IndexStorageReader + ProgressStorage,
{
    /// Creates a service reading from `store`.
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Returns block `block_number` of every requested partition that has it. An empty request
    /// covers every known partition.
    pub fn get_block(
        &self,
        block_number: u64,
        partition_ids: &[PartitionId],
    ) -> Result<BTreeMap<PartitionId, BlockRecord>, QueryError> {
        let mut blocks = BTreeMap::new();
        for partition_id in self.resolve(partition_ids)? {
            if let Some(block) = self.store.get_block(partition_id, block_number)? {
                blocks.insert(partition_id, block);
            }
        }
        Ok(blocks)
    }

    /// Returns up to `count` of the most recent blocks of every requested partition, newest
    /// first. An empty request covers every known partition.
    ///
    /// Empty blocks are dropped before counting unless `include_empty` is set.
    pub fn get_last_blocks(
        &self,
        partition_ids: &[PartitionId],
        count: usize,
        include_empty: bool,
    ) -> Result<BTreeMap<PartitionId, Vec<BlockRecord>>, QueryError> {
        if count == 0 {
            return Err(QueryError::InvalidArgument("count must be at least 1"));
        }

        let mut blocks = BTreeMap::new();
        for partition_id in self.resolve(partition_ids)? {
            let last =
                self.store.get_blocks_desc(partition_id, u64::MAX, count, include_empty)?;
            blocks.insert(partition_id, last);
        }
        Ok(blocks)
    }

    /// Returns up to `count` blocks of a partition starting at `start_block` and walking towards
    /// the first block.
    ///
    /// A full page points `prev_block_number` just below its last block, a short page ends the
    /// walk with `0`.
    pub fn get_blocks_in_range(
        &self,
        partition_id: PartitionId,
        start_block: u64,
        count: usize,
        include_empty: bool,
    ) -> Result<BlocksPage, QueryError> {
        if count == 0 {
            return Err(QueryError::InvalidArgument("count must be at least 1"));
        }

        let blocks = self.store.get_blocks_desc(partition_id, start_block, count, include_empty)?;
        let prev_block_number = match blocks.last() {
            Some(last) if blocks.len() == count => last.block_number.saturating_sub(1),
            _ => 0,
        };
        Ok(BlocksPage { blocks, prev_block_number })
    }

    /// Returns up to `limit` transactions of a partition, newest first, starting at the cursor
    /// `start` (inclusive) or at the most recent one.
    ///
    /// `previous_id` is the cursor of the following page, `None` when no transactions remain.
    pub fn get_txs_page(
        &self,
        partition_id: PartitionId,
        start: Option<u64>,
        limit: usize,
    ) -> Result<TxsPage, QueryError> {
        if limit == 0 {
            return Err(QueryError::InvalidArgument("limit must be at least 1"));
        }

        let mut txs = self.store.get_txs_desc(partition_id, start, limit.saturating_add(1))?;
        let previous_id =
            if txs.len() > limit { txs.pop().map(|tx| tx.insertion_sequence) } else { None };
        Ok(TxsPage { txs, previous_id })
    }

    /// Returns the transaction with the given record hash or order hash.
    pub fn get_tx(&self, hash: &[u8]) -> Result<Option<TxRecord>, QueryError> {
        Ok(self.store.get_tx(hash)?)
    }

    /// Returns the transactions of a block in block order.
    pub fn get_txs_by_block_number(
        &self,
        partition_id: PartitionId,
        block_number: u64,
    ) -> Result<Vec<TxRecord>, QueryError> {
        Ok(self.store.get_txs_by_block_number(partition_id, block_number)?)
    }

    /// Returns the transactions of a partition that touched `unit_id`, newest first.
    pub fn get_txs_by_unit_id(
        &self,
        partition_id: PartitionId,
        unit_id: &[u8],
    ) -> Result<Vec<TxRecord>, QueryError> {
        Ok(self.store.get_txs_by_unit_id(partition_id, unit_id)?)
    }

    /// Returns the transactions of a partition matching `key` by record hash, order hash or
    /// target unit.
    pub fn find_txs(
        &self,
        partition_id: PartitionId,
        key: &[u8],
    ) -> Result<Vec<TxRecord>, QueryError> {
        Ok(self.store.find_txs(partition_id, key)?)
    }

    /// Returns the number of the last indexed block of a partition.
    pub fn get_partition_progress(&self, partition_id: PartitionId) -> Result<u64, QueryError> {
        Ok(self.store.get_partition_progress(partition_id)?)
    }

    /// Returns every partition with indexed blocks.
    pub fn known_partitions(&self) -> Result<Vec<PartitionId>, QueryError> {
        Ok(self.store.known_partitions()?)
    }

    fn resolve(&self, partition_ids: &[PartitionId]) -> Result<Vec<PartitionId>, QueryError> {
        if partition_ids.is_empty() {
            return self.known_partitions();
        }
        Ok(partition_ids.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use unitscan_storage::{InMemoryStore, IndexStorageWriter};
    use unitscan_types::{B256, Bytes};

    fn block(partition_id: PartitionId, block_number: u64, txs: &[TxRecord]) -> BlockRecord {
        BlockRecord {
            partition_id,
            block_number,
            tx_hashes: txs.iter().map(|tx| tx.tx_record_hash).collect(),
            tx_count: txs.len(),
            ..Default::default()
        }
    }

    fn tx(partition_id: PartitionId, block_number: u64, tag: u8) -> TxRecord {
        TxRecord {
            partition_id,
            block_number,
            tx_record_hash: B256::repeat_byte(tag),
            tx_order_hash: B256::with_last_byte(tag),
            target_unit_ids: vec![Bytes::from_static(b"unit")],
            ..Default::default()
        }
    }

    /// Partition 1 holds blocks 1..=6 where only the even blocks carry a transaction.
    /// Partition 2 holds blocks 1..=2 without transactions.
    fn service() -> QueryService<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for number in 1..=6u64 {
            let txs = if number % 2 == 0 { vec![tx(1, number, number as u8)] } else { vec![] };
            store.commit_block(&block(1, number, &txs), txs).unwrap();
        }
        for number in 1..=2 {
            store.commit_block(&block(2, number, &[]), vec![]).unwrap();
        }
        QueryService::new(store)
    }

    #[test]
    fn test_get_block_skips_missing_partitions() {
        let service = service();

        let blocks = service.get_block(4, &[]).unwrap();
        assert_eq!(blocks.keys().copied().collect::<Vec<_>>(), vec![1]);

        let blocks = service.get_block(2, &[2, 9]).unwrap();
        assert_eq!(blocks.keys().copied().collect::<Vec<_>>(), vec![2]);
        assert!(service.get_block(7, &[1, 2]).unwrap().is_empty());
    }

    #[rstest]
    #[case::with_empty(true, vec![6, 5, 4])]
    #[case::without_empty(false, vec![6, 4, 2])]
    fn test_get_last_blocks(#[case] include_empty: bool, #[case] expected: Vec<u64>) {
        let last = service().get_last_blocks(&[1], 3, include_empty).unwrap();
        let numbers: Vec<_> = last[&1].iter().map(|block| block.block_number).collect();
        assert_eq!(numbers, expected);
    }

    #[test]
    fn test_get_last_blocks_covers_known_partitions() {
        let last = service().get_last_blocks(&[], 10, false).unwrap();

        assert_eq!(last.len(), 2);
        assert_eq!(last[&1].len(), 3);
        assert!(last[&2].is_empty());
    }

    #[rstest]
    #[case::full_page(6, 2, true, vec![6, 5], 4)]
    #[case::reaches_first_block(2, 3, true, vec![2, 1], 0)]
    #[case::exact_at_first_block(1, 1, true, vec![1], 0)]
    #[case::filtered(5, 2, false, vec![4, 2], 1)]
    fn test_get_blocks_in_range(
        #[case] start_block: u64,
        #[case] count: usize,
        #[case] include_empty: bool,
        #[case] expected: Vec<u64>,
        #[case] prev_block_number: u64,
    ) {
        let page = service().get_blocks_in_range(1, start_block, count, include_empty).unwrap();

        assert_eq!(page.blocks.iter().map(|b| b.block_number).collect::<Vec<_>>(), expected);
        assert_eq!(page.prev_block_number, prev_block_number);
    }

    #[test]
    fn test_txs_pages_cover_everything_once() {
        let service = service();

        let mut seen = vec![];
        let mut cursor = None;
        loop {
            let page = service.get_txs_page(1, cursor, 2).unwrap();
            assert!(page.txs.len() <= 2);
            seen.extend(page.txs.iter().map(|tx| tx.block_number));
            match page.previous_id {
                Some(previous_id) => cursor = Some(previous_id),
                None => break,
            }
        }

        assert_eq!(seen, vec![6, 4, 2]);
    }

    #[test]
    fn test_zero_sized_pages_are_rejected() {
        let service = service();

        assert!(matches!(
            service.get_txs_page(1, None, 0),
            Err(QueryError::InvalidArgument(_))
        ));
        assert!(matches!(
            service.get_blocks_in_range(1, 6, 0, true),
            Err(QueryError::InvalidArgument(_))
        ));
        assert!(matches!(
            service.get_last_blocks(&[1], 0, true),
            Err(QueryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_tx_lookups() {
        let service = service();
        let tx = service.get_tx(B256::with_last_byte(4).as_slice()).unwrap().unwrap();

        assert_eq!(tx.block_number, 4);
        assert_eq!(service.get_txs_by_block_number(1, 4).unwrap(), vec![tx.clone()]);
        assert!(service.get_txs_by_block_number(1, 5).unwrap().is_empty());
        assert_eq!(service.get_txs_by_unit_id(1, b"unit").unwrap().len(), 3);
        assert!(service.get_txs_by_unit_id(2, b"unit").unwrap().is_empty());
        assert_eq!(service.get_partition_progress(1).unwrap(), 6);
        assert_eq!(service.known_partitions().unwrap(), vec![1, 2]);
    }
}
