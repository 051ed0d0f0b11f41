//! chain-table: generic containers driven by caller-supplied capabilities.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: store elements of any type without requiring the type itself to
//!   implement clone/eq/hash/display. Every operation the containers need
//!   on an element is supplied as a capability value at construction.
//! - Layers:
//!   - LinkedList<T, O>: ordered, singly-linked sequence over a slotmap.
//!     Cursors are generational `Handle`s, so a stale cursor is detected
//!     instead of aliasing a reused slot.
//!   - HashTable<K, V, KO, VO>: fixed array of LinkedList buckets holding
//!     KeyValueCell values. Never resizes.
//!   - MultiValueTable<K, V, KO, VO>: HashTable whose values are
//!     LinkedLists of user values.
//!
//! Capabilities
//! - `Release`, `Render`, `Equivalence`, `Duplicate` and `Digest` are
//!   separate traits. A container states which ones each operation needs,
//!   so a missing capability is a compile error rather than a runtime one.
//! - `StdOps` fills all five from the std traits. `ByteSum` does the same
//!   for byte-string keys but digests by summing the key's bytes only
//!   (order-insensitive, useful for collisions).
//!
//! Ownership
//! - Each stored element has exactly one owner. Removing or dropping it
//!   calls `Release` once. Tables copy caller data in through `Duplicate`
//!   and never hand out ownership of stored copies.
//!
//! Reentrancy
//! - Containers hold a debug-only guard while capability callbacks run.
//!   A callback that calls back into the same container panics in debug
//!   builds. Release builds do not check.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (shared ops live behind `Rc`).
//! - Duplicate keys are not rejected by `HashTable::insert`; the oldest
//!   cell for a key answers lookups and is removed first.

pub mod capability;
pub mod cell;
pub mod config;
pub mod error;
pub mod hash_table;
pub mod linked_list;
mod linked_list_proptest;
pub mod multi_value;
mod reentrancy;

// Public surface
pub use capability::{
    ByteSum, Digest, Duplicate, ElementOps, Equivalence, KeyOps, Release, Render, StdOps, ValueOps,
};
pub use cell::{CellOps, KeyValueCell};
pub use config::{is_prime, next_prime, TableConfig};
pub use error::{Error, Result};
pub use hash_table::HashTable;
pub use linked_list::{Handle, Iter, LinkedList};
pub use multi_value::{MultiValueTable, ValueList, ValueListOps};

/// Containers that release everything they own on teardown.
pub trait Destroy {
    fn destroy(self);
}

impl<T, O: Release<T>> Destroy for LinkedList<T, O> {
    fn destroy(self) {
        LinkedList::destroy(self)
    }
}

impl<K, V, KO: Release<K>, VO: Release<V>> Destroy for HashTable<K, V, KO, VO> {
    fn destroy(self) {
        HashTable::destroy(self)
    }
}

impl<K, V, KO: Release<K>, VO: Release<V>> Destroy for MultiValueTable<K, V, KO, VO> {
    fn destroy(self) {
        MultiValueTable::destroy(self)
    }
}

/// Tear down a container that may not exist. `None` reports
/// [`Error::Absent`] and does nothing else.
pub fn destroy<C: Destroy>(container: Option<C>) -> Result<()> {
    match container {
        Some(c) => {
            c.destroy();
            Ok(())
        }
        None => Err(Error::Absent),
    }
}
