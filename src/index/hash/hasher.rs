//! Hash function and key comparator collaborators.

use std::cmp::Ordering;

use super::codec::FixedCodec;

/// Maps a key to a bucket-independent hash. Must be deterministic.
///
/// Any `Fn(&K) -> u64` closure is a `KeyHasher`.
pub trait KeyHasher<K>: Send + Sync {
    fn hash_key(&self, key: &K) -> u64;
}

impl<K, F> KeyHasher<K> for F
where
    F: Fn(&K) -> u64 + Send + Sync,
{
    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        self(key)
    }
}

/// CRC32 over the key's encoded bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32Hasher;

impl<K: FixedCodec> KeyHasher<K> for Crc32Hasher {
    fn hash_key(&self, key: &K) -> u64 {
        let mut buf = vec![0u8; K::SIZE];
        key.encode(&mut buf);
        u64::from(crc32fast::hash(&buf))
    }
}

/// Three-way key comparison. The index only asks for equality, but the
/// contract is a total order so the same comparator can serve ordered
/// structures.
///
/// Any `Fn(&K, &K) -> Ordering` closure is a `KeyComparator`.
pub trait KeyComparator<K>: Send + Sync {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

impl<K, F> KeyComparator<K> for F
where
    F: Fn(&K, &K) -> Ordering + Send + Sync,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}

/// Compares with the key's own `Ord`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultComparator;

impl<K: Ord> KeyComparator<K> for DefaultComparator {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::hash::GenericKey;

    #[test]
    fn test_crc32_hasher_is_deterministic() {
        let hasher = Crc32Hasher;
        assert_eq!(hasher.hash_key(&42i32), hasher.hash_key(&42i32));
        assert_ne!(hasher.hash_key(&42i32), hasher.hash_key(&43i32));
        assert_eq!(
            KeyHasher::<i32>::hash_key(&hasher, &1),
            u64::from(crc32fast::hash(&1i32.to_le_bytes()))
        );
    }

    #[test]
    fn test_crc32_hasher_generic_key() {
        let hasher = Crc32Hasher;
        let a = GenericKey::<8>::from_i64(5);
        assert_eq!(hasher.hash_key(&a), u64::from(crc32fast::hash(a.as_bytes())));
    }

    #[test]
    fn test_closures_are_collaborators() {
        let hasher = |k: &i32| *k as u64 * 10;
        assert_eq!(hasher.hash_key(&3), 30);

        let reversed = |a: &i32, b: &i32| b.cmp(a);
        assert_eq!(reversed.compare(&1, &2), Ordering::Greater);
        assert_eq!(DefaultComparator.compare(&1, &2), Ordering::Less);
    }
}
