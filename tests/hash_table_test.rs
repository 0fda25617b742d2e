//! Hash index tests through the public API, on both page stores.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use pinstore::buffer::BufferPoolManager;
use pinstore::common::{Error, PageId, Rid};
use pinstore::index::{
    DefaultComparator, GenericHashIndex, GenericKey, IntHashTable, LinearProbeHashTable,
};
use pinstore::storage::{DiskManager, MemoryDisk};
use tempfile::tempdir;

const CAP: usize = IntHashTable::SLOTS_PER_BLOCK;

fn memory_bpm(pool_size: usize) -> Arc<BufferPoolManager> {
    let _ = env_logger::builder().is_test(true).try_init();
    Arc::new(BufferPoolManager::new(pool_size, MemoryDisk::new()))
}

#[test]
fn test_sample_workload() {
    let table = IntHashTable::new(memory_bpm(50), 1000).unwrap();

    for i in 0..5 {
        assert!(table.insert(&i, &i).unwrap());
        assert_eq!(table.get_value(&i).unwrap(), vec![i]);
    }

    // Second value per key.
    for i in 0..5 {
        if i == 0 {
            // (0, 0) is already there.
            assert!(!table.insert(&i, &(2 * i)).unwrap());
        } else {
            assert!(table.insert(&i, &(2 * i)).unwrap());
        }
        let mut values = table.get_value(&i).unwrap();
        values.sort_unstable();
        if i == 0 {
            assert_eq!(values, vec![0]);
        } else {
            assert_eq!(values, vec![i, 2 * i]);
        }
    }

    assert!(table.get_value(&20).unwrap().is_empty());

    for i in 0..5 {
        assert!(table.remove(&i, &i).unwrap());
        let values = table.get_value(&i).unwrap();
        if i == 0 {
            assert!(values.is_empty());
        } else {
            assert_eq!(values, vec![2 * i]);
        }
    }

    for i in 0..5 {
        if i == 0 {
            assert!(!table.remove(&i, &(2 * i)).unwrap());
        } else {
            assert!(table.remove(&i, &(2 * i)).unwrap());
        }
    }
    assert!(table.is_empty().unwrap());
}

#[test]
fn test_probe_wraps_from_last_block_to_first() {
    // Bucket 2 * CAP - 1 is the last slot of block 1.
    let last_bucket = (2 * CAP - 1) as u64;
    let table = LinearProbeHashTable::<i32, i32, _, _>::with_hasher_and_comparator(
        memory_bpm(8),
        2 * CAP,
        move |_: &i32| last_bucket,
        DefaultComparator,
    )
    .unwrap();
    assert_eq!(table.num_blocks(), 2);

    assert!(table.insert(&1, &100).unwrap());
    assert!(table.insert(&2, &200).unwrap());
    assert_eq!(table.get_value(&1).unwrap(), vec![100]);
    assert_eq!(table.get_value(&2).unwrap(), vec![200]);

    // The second entry landed in block 0, slot 0.
    let bpm = Arc::clone(table.buffer_pool());
    let block0 = table.block_page_ids()[0];
    let guard = bpm.fetch_page_read(block0).unwrap();
    let data = guard.as_slice();
    let bitmap_len = CAP.div_ceil(8);
    assert_eq!(data[8] & 1, 1, "block 0 slot 0 occupied");
    let entry = 8 + 2 * bitmap_len;
    assert_eq!(&data[entry..entry + 4], &2i32.to_le_bytes());
    assert_eq!(&data[entry + 4..entry + 8], &200i32.to_le_bytes());
}

#[test]
fn test_full_table_reports_error() {
    let table = IntHashTable::new(memory_bpm(4), 1).unwrap();
    assert_eq!(table.num_blocks(), 1);

    for i in 0..CAP as i32 {
        assert!(table.insert(&i, &i).unwrap());
    }
    assert!(matches!(table.insert(&-1, &-1), Err(Error::HashTableFull)));
    // Duplicates are still recognised on a full table.
    assert!(!table.insert(&0, &0).unwrap());

    // A tombstone makes room again.
    assert!(table.remove(&7, &7).unwrap());
    assert!(table.insert(&-1, &-1).unwrap());
    assert_eq!(table.get_value(&-1).unwrap(), vec![-1]);
    assert_eq!(table.len().unwrap(), CAP);
}

#[test]
fn test_small_pool_forces_block_eviction() {
    let bpm = memory_bpm(2);
    let table = IntHashTable::new(Arc::clone(&bpm), CAP * 6).unwrap();
    assert_eq!(table.num_blocks(), 6);

    for i in 0..2000 {
        assert!(table.insert(&i, &(i + 1)).unwrap());
    }
    for i in 0..2000 {
        assert_eq!(table.get_value(&i).unwrap(), vec![i + 1]);
    }
    assert!(bpm.stats().snapshot().evictions > 0);
    assert!(bpm.stats().snapshot().dirty_writebacks > 0);
}

#[test]
fn test_resize_grows_past_capacity() {
    let table = IntHashTable::new(memory_bpm(16), 1).unwrap();
    for i in 0..CAP as i32 {
        table.insert(&i, &i).unwrap();
    }
    assert!(matches!(table.insert(&-5, &5), Err(Error::HashTableFull)));

    table.resize(CAP * 4).unwrap();
    assert_eq!(table.num_blocks(), 4);
    assert!(table.insert(&-5, &5).unwrap());
    for i in 0..CAP as i32 {
        assert_eq!(table.get_value(&i).unwrap(), vec![i]);
    }
    assert_eq!(table.len().unwrap(), CAP + 1);
}

#[test]
fn test_reopen_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hash.db");

    let header_page_id = {
        let bpm = Arc::new(BufferPoolManager::new(8, DiskManager::create(&path).unwrap()));
        let table = IntHashTable::new(Arc::clone(&bpm), 1500).unwrap();
        for i in 0..500 {
            table.insert(&i, &(i * 3)).unwrap();
        }
        table.remove(&10, &30).unwrap();
        let header_page_id = table.header_page_id();
        drop(table);
        bpm.flush_all_pages().unwrap();
        header_page_id
    };

    let bpm = Arc::new(BufferPoolManager::new(8, DiskManager::open(&path).unwrap()));
    let table = IntHashTable::open(Arc::clone(&bpm), header_page_id).unwrap();
    assert_eq!(table.num_buckets(), 1500);
    assert_eq!(table.num_blocks(), 1500usize.div_ceil(CAP));
    for i in 0..500 {
        let expected = if i == 10 { vec![] } else { vec![i * 3] };
        assert_eq!(table.get_value(&i).unwrap(), expected);
    }
}

#[test]
fn test_open_requires_header_page() {
    let bpm = memory_bpm(4);
    let data_page = bpm.new_page().unwrap().page_id();
    assert!(matches!(
        IntHashTable::open(Arc::clone(&bpm), data_page),
        Err(Error::CorruptedPage { .. })
    ));
    assert!(matches!(
        IntHashTable::open(bpm, PageId::new(77)),
        Err(Error::PageNotFound(77))
    ));
}

#[test]
fn test_generic_keys_to_rids() {
    let table = GenericHashIndex::<8>::new(memory_bpm(8), 500).unwrap();
    let rid = |i: i64| Rid::new(PageId::new((i / 10) as u32), (i % 10) as u32);

    for i in 0..300 {
        assert!(table.insert(&GenericKey::from_i64(i), &rid(i)).unwrap());
    }
    // Same key, second record.
    assert!(table.insert(&GenericKey::from_i64(5), &rid(1005)).unwrap());

    let values: HashSet<Rid> = table
        .get_value(&GenericKey::from_i64(5))
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(values, HashSet::from([rid(5), rid(1005)]));
    assert_eq!(table.get_value(&GenericKey::from_i64(299)).unwrap(), vec![rid(299)]);
    assert!(table.get_value(&GenericKey::from_i64(300)).unwrap().is_empty());
}

#[test]
fn test_concurrent_inserts_and_lookups() {
    const THREADS: i32 = 4;
    const PER_THREAD: i32 = 250;

    let table = Arc::new(IntHashTable::new(memory_bpm(6), 2000).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let key = t * PER_THREAD + i;
                    assert!(table.insert(&key, &-key).unwrap());
                    assert_eq!(table.get_value(&key).unwrap(), vec![-key]);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(table.len().unwrap(), (THREADS * PER_THREAD) as usize);
    for key in 0..THREADS * PER_THREAD {
        assert_eq!(table.get_value(&key).unwrap(), vec![-key]);
    }
    // Nothing left pinned.
    let bpm = table.buffer_pool();
    assert_eq!(bpm.evictable_count() + bpm.free_frame_count(), bpm.pool_size());
}
