//! MultiValueTable: key -> ordered, non-empty list of values.
//!
//! Built on [`HashTable`] with a [`LinkedList`] of user values in each
//! cell's value slot.
//!
//! Ownership
//! - Each value list has exactly one owner: the cell holding it. The inner
//!   table's value capability for lists ([`ValueListOps`]) releases a list
//!   by dropping it, and a dropped list releases its values through the
//!   caller's value ops. Nothing else ever releases a list or its values,
//!   so destroying the table releases every key once and every value once.
//! - Lists are moved into the inner table with `insert_owned`; they are
//!   never copied.
//!
//! State per key: absent, or present with a non-empty list. A removal that
//! empties a list removes the key before returning.

use crate::capability::{Digest, Duplicate, Equivalence, Release, Render};
use crate::config::TableConfig;
use crate::error::{Error, Result};
use crate::hash_table::HashTable;
use crate::linked_list::LinkedList;
use core::fmt;
use core::marker::PhantomData;
use log::{debug, trace, warn};
use std::rc::Rc;

/// The ordered values stored under one key.
pub type ValueList<V, VO> = LinkedList<V, Rc<VO>>;

/// Value capability the inner table uses for its value lists.
pub struct ValueListOps<VO> {
    _pd: PhantomData<VO>,
}

impl<VO> ValueListOps<VO> {
    fn new() -> Self {
        Self { _pd: PhantomData }
    }
}

// Default release drops the list, and the list releases its values.
impl<V, VO: Release<V>> Release<ValueList<V, VO>> for ValueListOps<VO> {}

impl<V, VO> Render<ValueList<V, VO>> for ValueListOps<VO>
where
    VO: Release<V> + Render<V>,
{
    fn render(&self, list: &ValueList<V, VO>, out: &mut dyn fmt::Write) -> fmt::Result {
        list.render_elements(out)
    }
}

/// Hash table mapping each key to an ordered list of values.
pub struct MultiValueTable<K, V, KO, VO>
where
    KO: Release<K>,
    VO: Release<V>,
{
    inner: HashTable<K, ValueList<V, VO>, KO, ValueListOps<VO>>,
    value_ops: Rc<VO>,
}

impl<K, V, KO, VO> MultiValueTable<K, V, KO, VO>
where
    KO: Release<K>,
    VO: Release<V>,
{
    pub fn new(key_ops: KO, value_ops: VO, bucket_count: usize) -> Result<Self> {
        let inner = HashTable::new(key_ops, ValueListOps::new(), bucket_count)?;
        debug!("multi-value table created with {} buckets", bucket_count);
        Ok(Self {
            inner,
            value_ops: Rc::new(value_ops),
        })
    }

    pub fn with_config(key_ops: KO, value_ops: VO, config: &TableConfig) -> Result<Self> {
        Self::new(key_ops, value_ops, config.bucket_count())
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Total number of values across all keys.
    pub fn value_count(&self) -> usize {
        self.inner.iter().map(|(_, list)| list.len()).sum()
    }

    pub fn bucket_count(&self) -> usize {
        self.inner.bucket_count()
    }

    pub fn key_ops(&self) -> &KO {
        self.inner.key_ops()
    }

    pub fn value_ops(&self) -> &VO {
        &self.value_ops
    }

    /// Every key with its value list.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &ValueList<V, VO>)> {
        self.inner.iter()
    }

    /// Release every key and value, then the table.
    pub fn destroy(self) {
        trace!("destroying multi-value table with {} keys", self.len());
        drop(self);
    }
}

impl<K, V, KO, VO> MultiValueTable<K, V, KO, VO>
where
    KO: Release<K> + Digest<K> + Equivalence<K>,
    VO: Release<V>,
{
    /// The values stored under `key`, in insertion order.
    pub fn lookup(&self, key: &K) -> Option<&ValueList<V, VO>> {
        self.inner.lookup(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    /// Drop `key` together with every value stored under it.
    pub fn remove_key(&mut self, key: &K) -> Result<()> {
        self.inner.remove(key)
    }
}

impl<K, V, KO, VO> MultiValueTable<K, V, KO, VO>
where
    KO: Release<K> + Digest<K> + Equivalence<K> + Duplicate<K>,
    VO: Release<V> + Duplicate<V>,
{
    /// Copy `value` into the list under `key`, creating the key (with a
    /// copy of `key`) when absent. On failure nothing allocated by this
    /// call survives.
    pub fn insert(&mut self, key: &K, value: &V) -> Result<()> {
        if let Some(list) = self.inner.lookup_mut(key) {
            let copy = self.value_ops.duplicate(value).map_err(|e| {
                warn!("value copy failed while extending an existing key");
                e
            })?;
            list.append(copy);
            return Ok(());
        }

        let key_copy = self.inner.key_ops().duplicate(key).map_err(|e| {
            warn!("key copy failed while adding a new key");
            e
        })?;
        let value_copy = match self.value_ops.duplicate(value) {
            Ok(v) => v,
            Err(e) => {
                warn!("value copy failed while adding a new key");
                self.inner.key_ops().release(key_copy);
                return Err(e);
            }
        };
        let mut list = LinkedList::new(Rc::clone(&self.value_ops));
        list.append(value_copy);
        self.inner.insert_owned(key_copy, list);
        Ok(())
    }
}

impl<K, V, KO, VO> MultiValueTable<K, V, KO, VO>
where
    KO: Release<K> + Digest<K> + Equivalence<K>,
    VO: Release<V> + Equivalence<V>,
{
    /// With `value == None`, remove the key and all its values. Otherwise
    /// remove the first equal value; if that empties the list, the key
    /// goes too.
    pub fn remove(&mut self, key: &K, value: Option<&V>) -> Result<()> {
        match value {
            None => self.remove_key(key),
            Some(v) => self.remove_value(key, v),
        }
    }

    pub fn remove_value(&mut self, key: &K, value: &V) -> Result<()> {
        let list = self.inner.lookup_mut(key).ok_or(Error::NotFound)?;
        list.delete(value)?;
        if list.is_empty() {
            trace!("last value removed, dropping key");
            self.inner.remove(key)?;
        }
        Ok(())
    }
}

impl<K, V, KO, VO> MultiValueTable<K, V, KO, VO>
where
    KO: Release<K> + Digest<K> + Equivalence<K> + Render<K>,
    VO: Release<V> + Render<V>,
{
    /// Render `key` then its values in order.
    pub fn display_by_key(&self, key: &K, out: &mut dyn fmt::Write) -> Result<()> {
        let list = self.lookup(key).ok_or(Error::NotFound)?;
        self.inner.key_ops().render(key, out)?;
        out.write_char('\n')?;
        list.display(out)
    }
}

impl<K, V, KO, VO> MultiValueTable<K, V, KO, VO>
where
    KO: Release<K> + Render<K>,
    VO: Release<V> + Render<V>,
{
    /// Render every key followed by its values.
    pub fn display(&self, out: &mut dyn fmt::Write) -> Result<()> {
        self.inner.display(out)
    }
}

impl<K, V, KO, VO> fmt::Debug for MultiValueTable<K, V, KO, VO>
where
    K: fmt::Debug,
    V: fmt::Debug,
    KO: Release<K>,
    VO: Release<V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.iter()).finish()
    }
}
