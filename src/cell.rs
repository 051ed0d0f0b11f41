//! Key-value cell: the unit stored in a hash table bucket.

use crate::capability::{Equivalence, Release, Render};
use crate::error::Result;
use core::fmt;

/// One key and one value, both owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueCell<K, V> {
    key: K,
    value: V,
}

impl<K, V> KeyValueCell<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}

/// Capability set for cells, assembled from the key ops and value ops.
///
/// Releasing a cell releases its key and then its value, each exactly
/// once. Cells compare equal when their keys do.
#[derive(Debug, Clone, Default)]
pub struct CellOps<KO, VO> {
    key_ops: KO,
    value_ops: VO,
}

impl<KO, VO> CellOps<KO, VO> {
    pub fn new(key_ops: KO, value_ops: VO) -> Self {
        Self { key_ops, value_ops }
    }

    pub fn key_ops(&self) -> &KO {
        &self.key_ops
    }

    pub fn value_ops(&self) -> &VO {
        &self.value_ops
    }

    /// Does `cell` hold a key equal to `candidate`?
    #[inline]
    pub fn key_equals<K, V>(&self, cell: &KeyValueCell<K, V>, candidate: &K) -> bool
    where
        KO: Equivalence<K>,
    {
        self.key_ops.equal(&cell.key, candidate)
    }

    pub fn display_key<K, V>(
        &self,
        cell: &KeyValueCell<K, V>,
        out: &mut dyn fmt::Write,
    ) -> Result<()>
    where
        KO: Render<K>,
    {
        self.key_ops.render(&cell.key, out)?;
        Ok(())
    }

    pub fn display_value<K, V>(
        &self,
        cell: &KeyValueCell<K, V>,
        out: &mut dyn fmt::Write,
    ) -> Result<()>
    where
        VO: Render<V>,
    {
        self.value_ops.render(&cell.value, out)?;
        Ok(())
    }

    /// Key, newline, value.
    pub fn display<K, V>(&self, cell: &KeyValueCell<K, V>, out: &mut dyn fmt::Write) -> Result<()>
    where
        KO: Render<K>,
        VO: Render<V>,
    {
        self.render(cell, out)?;
        Ok(())
    }
}

impl<K, V, KO, VO> Release<KeyValueCell<K, V>> for CellOps<KO, VO>
where
    KO: Release<K>,
    VO: Release<V>,
{
    fn release(&self, cell: KeyValueCell<K, V>) {
        let (key, value) = cell.into_parts();
        self.key_ops.release(key);
        self.value_ops.release(value);
    }
}

impl<K, V, KO, VO> Render<KeyValueCell<K, V>> for CellOps<KO, VO>
where
    KO: Render<K>,
    VO: Render<V>,
{
    fn render(&self, cell: &KeyValueCell<K, V>, out: &mut dyn fmt::Write) -> fmt::Result {
        self.key_ops.render(&cell.key, out)?;
        out.write_char('\n')?;
        self.value_ops.render(&cell.value, out)
    }
}

impl<K, V, KO, VO> Equivalence<KeyValueCell<K, V>> for CellOps<KO, VO>
where
    KO: Equivalence<K>,
{
    #[inline]
    fn equal(&self, a: &KeyValueCell<K, V>, b: &KeyValueCell<K, V>) -> bool {
        self.key_ops.equal(&a.key, &b.key)
    }
}
