//! Property tests: the hash index against a map model, the replacer against
//! a set model, and buffer pool pin accounting under random guard traffic.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use proptest::prelude::*;

use pinstore::buffer::replacer::{ClockReplacer, Replacer};
use pinstore::buffer::BufferPoolManager;
use pinstore::common::{FrameId, PageId};
use pinstore::index::IntHashTable;
use pinstore::storage::MemoryDisk;

#[derive(Debug, Clone)]
enum TableOp {
    Insert(i32, i32),
    Remove(i32, i32),
    Get(i32),
}

fn table_op() -> impl Strategy<Value = TableOp> {
    prop_oneof![
        3 => (-40..40i32, 0..4i32).prop_map(|(k, v)| TableOp::Insert(k, v)),
        2 => (-40..40i32, 0..4i32).prop_map(|(k, v)| TableOp::Remove(k, v)),
        1 => (-40..40i32).prop_map(TableOp::Get),
    ]
}

#[derive(Debug, Clone)]
enum ReplacerOp {
    Pin(usize),
    Unpin(usize),
    Victim,
    Remove(usize),
}

fn replacer_op(frames: usize) -> impl Strategy<Value = ReplacerOp> {
    prop_oneof![
        (0..frames).prop_map(ReplacerOp::Pin),
        (0..frames).prop_map(ReplacerOp::Unpin),
        Just(ReplacerOp::Victim),
        (0..frames).prop_map(ReplacerOp::Remove),
    ]
}

#[derive(Debug, Clone)]
enum PoolOp {
    NewPage,
    Read(usize),
    Write(usize, u8),
    Release(usize),
}

fn pool_op() -> impl Strategy<Value = PoolOp> {
    prop_oneof![
        1 => Just(PoolOp::NewPage),
        3 => any::<usize>().prop_map(PoolOp::Read),
        2 => (any::<usize>(), any::<u8>()).prop_map(|(i, b)| PoolOp::Write(i, b)),
        3 => any::<usize>().prop_map(PoolOp::Release),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_hash_table_matches_model(
        num_buckets in 1usize..1200,
        pool_size in 2usize..6,
        ops in prop::collection::vec(table_op(), 1..200),
    ) {
        let bpm = Arc::new(BufferPoolManager::new(pool_size, MemoryDisk::new()));
        let table = IntHashTable::new(bpm, num_buckets).unwrap();
        let mut model: HashMap<i32, HashSet<i32>> = HashMap::new();

        for op in ops {
            match op {
                TableOp::Insert(k, v) => {
                    let fresh = model.entry(k).or_default().insert(v);
                    prop_assert_eq!(table.insert(&k, &v).unwrap(), fresh);
                }
                TableOp::Remove(k, v) => {
                    let present = model.get_mut(&k).is_some_and(|vs| vs.remove(&v));
                    prop_assert_eq!(table.remove(&k, &v).unwrap(), present);
                }
                TableOp::Get(k) => {
                    let got: HashSet<i32> = table.get_value(&k).unwrap().into_iter().collect();
                    prop_assert_eq!(got, model.get(&k).cloned().unwrap_or_default());
                }
            }
        }

        let live: usize = model.values().map(HashSet::len).sum();
        prop_assert_eq!(table.len().unwrap(), live);
    }

    #[test]
    fn prop_clock_replacer_matches_model(
        frames in 1usize..12,
        ops in prop::collection::vec(replacer_op(12), 1..300),
    ) {
        let mut replacer = ClockReplacer::new(frames);
        // Frames currently eligible for eviction.
        let mut eligible: BTreeSet<usize> = BTreeSet::new();

        for op in ops {
            match op {
                ReplacerOp::Pin(f) if f < frames => {
                    replacer.pin(FrameId::new(f));
                    eligible.remove(&f);
                }
                ReplacerOp::Unpin(f) if f < frames => {
                    replacer.unpin(FrameId::new(f));
                    eligible.insert(f);
                }
                ReplacerOp::Remove(f) if f < frames => {
                    replacer.remove(FrameId::new(f));
                    eligible.remove(&f);
                }
                ReplacerOp::Victim => match replacer.victim() {
                    Some(fid) => {
                        prop_assert!(eligible.remove(&fid.0));
                    }
                    None => {
                        prop_assert!(eligible.is_empty());
                    }
                },
                _ => {}
            }
            prop_assert_eq!(replacer.size(), eligible.len());
        }
    }

    #[test]
    fn prop_pins_never_exceed_pool(
        pool_size in 1usize..6,
        ops in prop::collection::vec(pool_op(), 1..150),
    ) {
        let bpm = BufferPoolManager::new(pool_size, MemoryDisk::new());
        // Expected first byte of each page.
        let mut contents: Vec<(PageId, u8)> = Vec::new();
        let mut held = Vec::new();

        for op in ops {
            match op {
                PoolOp::NewPage => {
                    if let Ok(guard) = bpm.new_page() {
                        contents.push((guard.page_id(), 0));
                        held.push(guard);
                    } else {
                        prop_assert_eq!(held.len(), pool_size);
                    }
                }
                PoolOp::Read(i) if !contents.is_empty() => {
                    let (pid, byte) = contents[i % contents.len()];
                    // A page whose write guard we hold would deadlock.
                    if held.iter().all(|g| g.page_id() != pid) {
                        match bpm.fetch_page_write(pid) {
                            Ok(guard) => {
                                prop_assert_eq!(guard.as_slice()[0], byte);
                                held.push(guard);
                            }
                            Err(_) => prop_assert_eq!(held.len(), pool_size),
                        }
                    }
                }
                PoolOp::Write(i, b) if !held.is_empty() => {
                    let n = held.len();
                    let guard = &mut held[i % n];
                    guard.as_mut_slice()[0] = b;
                    let pid = guard.page_id();
                    if let Some(entry) = contents.iter_mut().find(|(p, _)| *p == pid) {
                        entry.1 = b;
                    }
                }
                PoolOp::Release(i) if !held.is_empty() => {
                    let idx = i % held.len();
                    held.swap_remove(idx);
                }
                _ => {}
            }

            prop_assert!(held.len() <= pool_size);
            prop_assert_eq!(
                bpm.evictable_count() + bpm.free_frame_count() + held.len(),
                pool_size
            );
        }

        drop(held);
        for (pid, byte) in contents {
            prop_assert_eq!(bpm.fetch_page_read(pid).unwrap().as_slice()[0], byte);
        }
    }
}
