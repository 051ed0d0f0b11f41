//! HashTable: fixed array of bucket lists holding key-value cells.
//!
//! Placement is `digest(key) mod bucket_count`; collisions chain inside
//! the bucket's [`LinkedList`]. The bucket count never changes.
//!
//! `insert` does not look for an existing key. Inserting a key twice
//! leaves two cells in the same bucket, and `lookup`/`remove` always act
//! on the older one first (chain order is insertion order).

use crate::capability::{Digest, Duplicate, Equivalence, Release, Render};
use crate::cell::{CellOps, KeyValueCell};
use crate::config::TableConfig;
use crate::error::{Error, Result};
use crate::linked_list::LinkedList;
use crate::reentrancy::CallbackGuard;
use core::fmt;
use log::{debug, trace, warn};
use std::rc::Rc;

type Bucket<K, V, KO, VO> = LinkedList<KeyValueCell<K, V>, Rc<CellOps<KO, VO>>>;

/// Chained hash table with a fixed number of buckets.
pub struct HashTable<K, V, KO, VO>
where
    KO: Release<K>,
    VO: Release<V>,
{
    ops: Rc<CellOps<KO, VO>>,
    buckets: Box<[Bucket<K, V, KO, VO>]>,
    len: usize,
    guard: CallbackGuard,
}

#[inline]
fn bucket_index<K, KO: Digest<K>>(ops: &KO, key: &K, buckets: usize) -> usize {
    (ops.digest(key) % buckets as u64) as usize
}

impl<K, V, KO, VO> HashTable<K, V, KO, VO>
where
    KO: Release<K>,
    VO: Release<V>,
{
    /// Build a table with exactly `bucket_count` empty buckets.
    pub fn new(key_ops: KO, value_ops: VO, bucket_count: usize) -> Result<Self> {
        if bucket_count == 0 {
            return Err(Error::ZeroBuckets);
        }
        let ops = Rc::new(CellOps::new(key_ops, value_ops));
        let buckets = (0..bucket_count)
            .map(|_| LinkedList::new(Rc::clone(&ops)))
            .collect();
        debug!("hash table created with {} buckets", bucket_count);
        Ok(Self {
            ops,
            buckets,
            len: 0,
            guard: CallbackGuard::new(),
        })
    }

    /// Build a table sized by `config`.
    pub fn with_config(key_ops: KO, value_ops: VO, config: &TableConfig) -> Result<Self> {
        Self::new(key_ops, value_ops, config.bucket_count())
    }

    /// Number of cells, counting repeated keys separately.
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn key_ops(&self) -> &KO {
        self.ops.key_ops()
    }

    pub fn value_ops(&self) -> &VO {
        self.ops.value_ops()
    }

    /// Every `(key, value)` pair, bucket by bucket, chain order within.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.buckets
            .iter()
            .flat_map(|b| b.iter())
            .map(|c| (c.key(), c.value()))
    }

    /// Release every cell, then the table.
    pub fn destroy(self) {
        trace!("destroying hash table with {} cells", self.len);
        drop(self);
    }
}

impl<K, V, KO, VO> HashTable<K, V, KO, VO>
where
    KO: Release<K> + Digest<K>,
    VO: Release<V>,
{
    /// Take ownership of `key` and `value` and append them to the key's
    /// bucket without copying.
    pub fn insert_owned(&mut self, key: K, value: V) {
        let _g = self.guard.open("insert_owned");
        let index = bucket_index(self.ops.key_ops(), &key, self.buckets.len());
        self.buckets[index].append(KeyValueCell::new(key, value));
        self.len += 1;
        trace!("cell placed in bucket {}", index);
    }
}

impl<K, V, KO, VO> HashTable<K, V, KO, VO>
where
    KO: Release<K> + Digest<K> + Duplicate<K>,
    VO: Release<V> + Duplicate<V>,
{
    /// Copy `key` and `value` through the copy capabilities and store the
    /// copies. A failed copy releases whatever was copied so far and
    /// leaves the table untouched.
    pub fn insert(&mut self, key: &K, value: &V) -> Result<()> {
        let (key, value) = {
            let _g = self.guard.open("insert");
            let key = self.ops.key_ops().duplicate(key).map_err(|e| {
                warn!("key copy failed during insert");
                e
            })?;
            match self.ops.value_ops().duplicate(value) {
                Ok(value) => (key, value),
                Err(e) => {
                    warn!("value copy failed during insert");
                    self.ops.key_ops().release(key);
                    return Err(e);
                }
            }
        };
        self.insert_owned(key, value);
        Ok(())
    }
}

impl<K, V, KO, VO> HashTable<K, V, KO, VO>
where
    KO: Release<K> + Digest<K> + Equivalence<K>,
    VO: Release<V>,
{
    /// Value of the first cell whose key equals `key`.
    pub fn lookup(&self, key: &K) -> Option<&V> {
        let _g = self.guard.open("lookup");
        let ops = &self.ops;
        let index = bucket_index(ops.key_ops(), key, self.buckets.len());
        self.buckets[index]
            .search(key, |cell, k| ops.key_equals(cell, k))
            .map(|cell| cell.value())
    }

    pub fn lookup_mut(&mut self, key: &K) -> Option<&mut V> {
        let _g = self.guard.open("lookup_mut");
        let ops = &self.ops;
        let index = bucket_index(ops.key_ops(), key, self.buckets.len());
        let bucket = &mut self.buckets[index];
        let h = bucket.find(|cell| ops.key_equals(cell, key))?;
        bucket.get_mut(h).map(|cell| cell.value_mut())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.lookup(key).is_some()
    }

    /// Delete the first cell whose key equals `key`, releasing its key and
    /// value.
    pub fn remove(&mut self, key: &K) -> Result<()> {
        let index = {
            let _g = self.guard.open("remove");
            bucket_index(self.ops.key_ops(), key, self.buckets.len())
        };
        let ops = &self.ops;
        self.buckets[index].delete_by(|cell| ops.key_equals(cell, key))?;
        self.len -= 1;
        trace!("cell removed from bucket {}", index);
        Ok(())
    }
}

impl<K, V, KO, VO> HashTable<K, V, KO, VO>
where
    KO: Release<K> + Render<K>,
    VO: Release<V> + Render<V>,
{
    /// Render every cell, bucket order then chain order.
    pub fn display(&self, out: &mut dyn fmt::Write) -> Result<()> {
        let _g = self.guard.open("display");
        for bucket in self.buckets.iter() {
            bucket.render_elements(out)?;
        }
        Ok(())
    }
}

impl<K, V, KO, VO> fmt::Debug for HashTable<K, V, KO, VO>
where
    K: fmt::Debug,
    V: fmt::Debug,
    KO: Release<K>,
    VO: Release<V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ByteSum;
    use std::cell::Cell;

    type StrTable = HashTable<String, i32, ByteSum, ByteSum>;

    fn table(buckets: usize) -> StrTable {
        HashTable::new(ByteSum, ByteSum, buckets).unwrap()
    }

    fn s(v: &str) -> String {
        v.to_string()
    }

    /// Copy capability that fails on demand and counts releases.
    #[derive(Clone, Default)]
    struct Flaky {
        fail: Rc<Cell<bool>>,
        released: Rc<Cell<usize>>,
    }
    impl Release<String> for Flaky {
        fn release(&self, _item: String) {
            self.released.set(self.released.get() + 1);
        }
    }
    impl Release<i32> for Flaky {
        fn release(&self, _item: i32) {
            self.released.set(self.released.get() + 1);
        }
    }
    impl<T: Clone> Duplicate<T> for Flaky {
        fn duplicate(&self, item: &T) -> Result<T> {
            if self.fail.get() {
                Err(Error::CopyFailed)
            } else {
                Ok(item.clone())
            }
        }
    }
    impl Digest<String> for Flaky {
        fn digest(&self, item: &String) -> u64 {
            item.len() as u64
        }
    }
    impl Equivalence<String> for Flaky {
        fn equal(&self, a: &String, b: &String) -> bool {
            a == b
        }
    }

    /// Invariant: zero buckets is a construction failure.
    #[test]
    fn zero_buckets_rejected() {
        let r: Result<StrTable> = HashTable::new(ByteSum, ByteSum, 0);
        assert!(matches!(r, Err(Error::ZeroBuckets)));
    }

    /// Invariant: inserted pairs are found until removed.
    #[test]
    fn insert_lookup_remove_round_trip() {
        let mut t = table(7);
        t.insert(&s("a"), &1).unwrap();
        t.insert(&s("b"), &2).unwrap();
        assert_eq!(t.lookup(&s("a")), Some(&1));
        assert_eq!(t.lookup(&s("b")), Some(&2));
        assert_eq!(t.lookup(&s("c")), None);
        assert_eq!(t.len(), 2);

        t.remove(&s("a")).unwrap();
        assert_eq!(t.lookup(&s("a")), None);
        assert!(t.contains_key(&s("b")));
        assert_eq!(t.remove(&s("a")), Err(Error::NotFound));
        assert_eq!(t.len(), 1);
    }

    /// Invariant: a repeated key does not overwrite; the first insert wins
    /// until its cell is removed, then the second one surfaces.
    #[test]
    fn duplicate_key_first_insert_wins() {
        let mut t = table(7);
        t.insert(&s("a"), &1).unwrap();
        t.insert(&s("b"), &2).unwrap();
        t.insert(&s("a"), &3).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.lookup(&s("a")), Some(&1));

        t.remove(&s("a")).unwrap();
        assert_eq!(t.lookup(&s("a")), Some(&3));
        t.remove(&s("a")).unwrap();
        assert_eq!(t.lookup(&s("a")), None);
    }

    /// Invariant: every cell sits in bucket `digest mod N`. With a byte-sum
    /// digest anagrams share a bucket and still resolve by equality.
    #[test]
    fn colliding_keys_resolve_by_equality() {
        let mut t = table(5);
        t.insert(&s("ab"), &1).unwrap();
        t.insert(&s("ba"), &2).unwrap();
        let d = t.key_ops().digest(&s("ab"));
        assert_eq!(d, t.key_ops().digest(&s("ba")));
        let index = (d % 5) as usize;
        assert_eq!(t.buckets[index].len(), 2);
        assert_eq!(t.lookup(&s("ab")), Some(&1));
        assert_eq!(t.lookup(&s("ba")), Some(&2));
    }

    /// Invariant: lookup_mut edits the live value of the first match.
    #[test]
    fn lookup_mut_updates_in_place() {
        let mut t = table(3);
        t.insert(&s("k"), &10).unwrap();
        *t.lookup_mut(&s("k")).unwrap() += 5;
        assert_eq!(t.lookup(&s("k")), Some(&15));
        assert!(t.lookup_mut(&s("zz")).is_none());
    }

    /// Invariant: a failed value copy releases the key copy and leaves the
    /// table unchanged; a failed key copy releases nothing.
    #[test]
    fn failed_copy_rolls_back() {
        let key_ops = Flaky::default();
        let value_ops = Flaky::default();
        let mut t: HashTable<String, i32, Flaky, Flaky> =
            HashTable::new(key_ops.clone(), value_ops.clone(), 3).unwrap();
        t.insert(&s("ok"), &1).unwrap();

        value_ops.fail.set(true);
        assert_eq!(t.insert(&s("bad"), &2), Err(Error::CopyFailed));
        assert_eq!(key_ops.released.get(), 1);
        assert_eq!(value_ops.released.get(), 0);
        assert_eq!(t.len(), 1);
        assert_eq!(t.lookup(&s("bad")), None);

        value_ops.fail.set(false);
        key_ops.fail.set(true);
        assert_eq!(t.insert(&s("bad"), &2), Err(Error::CopyFailed));
        assert_eq!(key_ops.released.get(), 1);

        drop(t);
        assert_eq!(key_ops.released.get(), 2);
        assert_eq!(value_ops.released.get(), 1);
    }

    /// Invariant: remove and destroy release each stored key and value once.
    #[test]
    fn release_counts_match_cells() {
        let key_ops = Flaky::default();
        let value_ops = Flaky::default();
        let mut t: HashTable<String, i32, Flaky, Flaky> =
            HashTable::new(key_ops.clone(), value_ops.clone(), 5).unwrap();
        for (i, k) in ["a", "bb", "cc", "a"].iter().enumerate() {
            t.insert(&s(k), &(i as i32)).unwrap();
        }
        t.remove(&s("cc")).unwrap();
        assert_eq!((key_ops.released.get(), value_ops.released.get()), (1, 1));
        t.destroy();
        assert_eq!((key_ops.released.get(), value_ops.released.get()), (4, 4));
    }

    /// Iteration and display cover every cell exactly once.
    #[test]
    fn iter_and_display_cover_all_cells() {
        let mut t = table(1);
        t.insert(&s("x"), &1).unwrap();
        t.insert(&s("y"), &2).unwrap();
        let pairs: Vec<(String, i32)> = t.iter().map(|(k, v)| (k.clone(), *v)).collect();
        assert_eq!(pairs, vec![(s("x"), 1), (s("y"), 2)]);

        let mut out = String::new();
        t.display(&mut out).unwrap();
        assert_eq!(out, "x\n1\ny\n2\n");
        assert_eq!(format!("{:?}", t), r#"{"x": 1, "y": 2}"#);
    }

    /// Config sizing rounds to a prime bucket count.
    #[test]
    fn with_config_uses_prime_bucket_count() {
        let t: StrTable = HashTable::with_config(ByteSum, ByteSum, &TableConfig::new(8)).unwrap();
        assert_eq!(t.bucket_count(), 11);
        assert!(t.is_empty());
    }
}
