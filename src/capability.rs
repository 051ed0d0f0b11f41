//! Capability protocol: the operations a container borrows from its caller.
//!
//! Containers never look inside their elements. Everything they need
//! (copying, releasing, rendering, comparing, hashing) comes from an *ops*
//! value handed to the constructor, in the same spirit as the `S:
//! BuildHasher` parameter of a std map. Each operation is its own small
//! trait so a container can ask for exactly what it uses; the combined
//! traits at the bottom of this module name the usual bundles.

use crate::error::Result;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;
use std::rc::Rc;

/// Reclaims an element. Called exactly once per owned element.
pub trait Release<T> {
    #[inline]
    fn release(&self, item: T) {
        drop(item);
    }
}

/// Renders an element for diagnostics.
pub trait Render<T> {
    fn render(&self, item: &T, out: &mut dyn fmt::Write) -> fmt::Result;
}

/// Value identity between two elements.
pub trait Equivalence<T> {
    fn equal(&self, a: &T, b: &T) -> bool;
}

/// Produces an independent copy. May fail, which containers treat like an
/// allocation failure: the in-flight operation is rolled back.
pub trait Duplicate<T> {
    fn duplicate(&self, item: &T) -> Result<T>;
}

/// Deterministic numeric digest used for bucket placement.
pub trait Digest<T> {
    fn digest(&self, item: &T) -> u64;
}

/// What a linked list needs from its element ops.
pub trait ElementOps<T>: Release<T> + Render<T> + Equivalence<T> {}

impl<T, O> ElementOps<T> for O where O: Release<T> + Render<T> + Equivalence<T> {}

/// What a hash table needs from its key ops.
pub trait KeyOps<K>: Duplicate<K> + Release<K> + Render<K> + Equivalence<K> + Digest<K> {}

impl<K, O> KeyOps<K> for O where
    O: Duplicate<K> + Release<K> + Render<K> + Equivalence<K> + Digest<K>
{
}

/// What a hash table needs from its value ops.
pub trait ValueOps<V>: Duplicate<V> + Release<V> + Render<V> {}

impl<V, O> ValueOps<V> for O where O: Duplicate<V> + Release<V> + Render<V> {}

// Shared ops: bucket lists and sub-lists all point at one ops value.

impl<T, O: Release<T> + ?Sized> Release<T> for Rc<O> {
    #[inline]
    fn release(&self, item: T) {
        (**self).release(item)
    }
}

impl<T, O: Render<T> + ?Sized> Render<T> for Rc<O> {
    #[inline]
    fn render(&self, item: &T, out: &mut dyn fmt::Write) -> fmt::Result {
        (**self).render(item, out)
    }
}

impl<T, O: Equivalence<T> + ?Sized> Equivalence<T> for Rc<O> {
    #[inline]
    fn equal(&self, a: &T, b: &T) -> bool {
        (**self).equal(a, b)
    }
}

impl<T, O: Duplicate<T> + ?Sized> Duplicate<T> for Rc<O> {
    #[inline]
    fn duplicate(&self, item: &T) -> Result<T> {
        (**self).duplicate(item)
    }
}

impl<T, O: Digest<T> + ?Sized> Digest<T> for Rc<O> {
    #[inline]
    fn digest(&self, item: &T) -> u64 {
        (**self).digest(item)
    }
}

/// Capability set for ordinary Rust values: `Clone` copies, `Drop`
/// releases, `Display` renders, `PartialEq` compares and `Hash` digests
/// through the injected `S`.
///
/// The default builder is hashbrown's fixed-seed one, so digests are
/// stable for the life of the process.
#[derive(Clone, Debug, Default)]
pub struct StdOps<S = DefaultHashBuilder> {
    hasher: S,
}

impl<S> StdOps<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }
}

impl<T, S> Release<T> for StdOps<S> {}

impl<T: fmt::Display, S> Render<T> for StdOps<S> {
    fn render(&self, item: &T, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{}", item)
    }
}

impl<T: PartialEq, S> Equivalence<T> for StdOps<S> {
    #[inline]
    fn equal(&self, a: &T, b: &T) -> bool {
        a == b
    }
}

impl<T: Clone, S> Duplicate<T> for StdOps<S> {
    #[inline]
    fn duplicate(&self, item: &T) -> Result<T> {
        Ok(item.clone())
    }
}

impl<T: Hash, S: BuildHasher> Digest<T> for StdOps<S> {
    #[inline]
    fn digest(&self, item: &T) -> u64 {
        self.hasher.hash_one(item)
    }
}

/// Capability set for byte-string keys whose digest is the plain sum of
/// the key's bytes, with nothing else mixed in: `"abc"` digests to
/// `97 + 98 + 99`.
///
/// Copy, release, render and equality behave as in [`StdOps`]. Anagrams
/// collide by construction, so bucket placement is easy to predict.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ByteSum;

impl ByteSum {
    #[inline]
    pub fn sum(bytes: &[u8]) -> u64 {
        bytes
            .iter()
            .fold(0u64, |acc, &b| acc.wrapping_add(u64::from(b)))
    }
}

impl<T> Release<T> for ByteSum {}

impl<T: fmt::Display> Render<T> for ByteSum {
    fn render(&self, item: &T, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{}", item)
    }
}

impl<T: PartialEq> Equivalence<T> for ByteSum {
    #[inline]
    fn equal(&self, a: &T, b: &T) -> bool {
        a == b
    }
}

impl<T: Clone> Duplicate<T> for ByteSum {
    #[inline]
    fn duplicate(&self, item: &T) -> Result<T> {
        Ok(item.clone())
    }
}

impl<T: AsRef<[u8]>> Digest<T> for ByteSum {
    #[inline]
    fn digest(&self, item: &T) -> u64 {
        Self::sum(item.as_ref())
    }
}
