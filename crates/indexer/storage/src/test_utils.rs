//! Checks shared by the storage backend tests.

use crate::{IndexStorageReader, IndexStorageWriter, ProgressStorage};
use unitscan_types::{B256, BlockRecord, Bytes, TxRecord};

/// Commits blocks on one thread while the current thread reads. Whenever the progress says
/// block `n` is indexed, block `n` and all of its transactions must be readable.
pub(crate) fn assert_commits_are_atomic<S>(store: &S)
where
    S: ProgressStorage + IndexStorageWriter + IndexStorageReader,
{
    const LAST_BLOCK: u64 = 100;

    std::thread::scope(|scope| {
        let writer = scope.spawn(|| {
            for number in 1..=LAST_BLOCK {
                let txs: Vec<_> = (0..number % 3)
                    .map(|index| TxRecord {
                        partition_id: 1,
                        block_number: number,
                        tx_record_hash: B256::left_padding_from(&[number as u8, index as u8, 1]),
                        tx_order_hash: B256::left_padding_from(&[number as u8, index as u8, 2]),
                        target_unit_ids: vec![Bytes::from_static(b"u1")],
                        ..Default::default()
                    })
                    .collect();
                let block = BlockRecord {
                    partition_id: 1,
                    block_number: number,
                    tx_count: txs.len(),
                    ..Default::default()
                };
                store.commit_block(&block, txs).unwrap();
            }
        });

        loop {
            let finished = writer.is_finished();
            let progress = store.get_partition_progress(1).unwrap();
            if progress > 0 {
                let block = store.get_block(1, progress).unwrap().expect("block of progress");
                let txs = store.get_txs_by_block_number(1, progress).unwrap();
                assert_eq!(txs.len(), block.tx_count);
            }
            if finished {
                assert_eq!(progress, LAST_BLOCK);
                break;
            }
        }
    });
}
