//! LinkedList: singly-linked sequence over a generational node arena.
//!
//! Nodes live in a `SlotMap`; links are slot keys. A [`Handle`] is one of
//! those keys wrapped up, so it doubles as a traversal cursor: once its
//! node is removed the handle stops resolving instead of aliasing
//! whatever node reuses the slot.
//!
//! Invariants:
//! - `len() == 0` iff `head == tail == None`.
//! - The tail node has no successor.
//! - Walking `next` from the head visits exactly `len()` nodes and ends at
//!   the tail.
//! - Every element leaving the list without being handed back to the
//!   caller goes through `O::release` exactly once.

use crate::capability::{Equivalence, Release, Render};
use crate::error::{Error, Result};
use crate::reentrancy::CallbackGuard;
use core::fmt;
use slotmap::{DefaultKey, SlotMap};

/// Cursor to one node of a [`LinkedList`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

impl Handle {
    fn new(k: DefaultKey) -> Self {
        Handle(k)
    }
    fn raw(&self) -> DefaultKey {
        self.0
    }
}

#[derive(Debug)]
struct Node<T> {
    element: T,
    next: Option<DefaultKey>,
}

/// Ordered sequence of owned elements, released through `O` on removal.
pub struct LinkedList<T, O>
where
    O: Release<T>,
{
    ops: O,
    nodes: SlotMap<DefaultKey, Node<T>>,
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
    guard: CallbackGuard,
}

/// Forward iterator in list order.
pub struct Iter<'a, T> {
    nodes: &'a SlotMap<DefaultKey, Node<T>>,
    cursor: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let node = self.nodes.get(self.cursor?)?;
        self.cursor = node.next;
        self.remaining -= 1;
        Some(&node.element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}

impl<T, O> LinkedList<T, O>
where
    O: Release<T>,
{
    pub fn new(ops: O) -> Self {
        Self {
            ops,
            nodes: SlotMap::with_key(),
            head: None,
            tail: None,
            guard: CallbackGuard::new(),
        }
    }

    pub fn ops(&self) -> &O {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add `element` at the tail. O(1).
    pub fn append(&mut self, element: T) -> Handle {
        let k = self.nodes.insert(Node {
            element,
            next: None,
        });
        match self.tail {
            Some(t) => {
                if let Some(node) = self.nodes.get_mut(t) {
                    node.next = Some(k);
                }
            }
            None => self.head = Some(k),
        }
        self.tail = Some(k);
        Handle::new(k)
    }

    pub fn first(&self) -> Option<Handle> {
        self.head.map(Handle::new)
    }

    /// Successor of `h`, or `None` at the tail or when `h` is stale.
    pub fn next(&self, h: Handle) -> Option<Handle> {
        self.nodes.get(h.raw())?.next.map(Handle::new)
    }

    pub fn get(&self, h: Handle) -> Option<&T> {
        self.nodes.get(h.raw()).map(|n| &n.element)
    }

    pub fn get_mut(&mut self, h: Handle) -> Option<&mut T> {
        self.nodes.get_mut(h.raw()).map(|n| &mut n.element)
    }

    /// Element at 0-based position `index`. O(n).
    pub fn element_at(&self, index: usize) -> Result<&T> {
        self.iter().nth(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.len(),
        })
    }

    /// First element for which `predicate(element, key)` holds. O(n).
    ///
    /// The predicate is independent of the list's own equality so callers
    /// can match on a derived key, e.g. one field of a record.
    pub fn search<Q, P>(&self, key: &Q, mut predicate: P) -> Option<&T>
    where
        Q: ?Sized,
        P: FnMut(&T, &Q) -> bool,
    {
        let _g = self.guard.open("search");
        self.iter().find(|e| predicate(*e, key))
    }

    /// Handle of the first element matching `predicate`.
    pub fn find<P>(&self, mut predicate: P) -> Option<Handle>
    where
        P: FnMut(&T) -> bool,
    {
        let _g = self.guard.open("find");
        self.find_raw(&mut predicate).map(|(_, k)| Handle::new(k))
    }

    /// Unlink the node behind `h` and hand its element back to the caller
    /// without releasing it. `None` if the handle is stale.
    pub fn remove(&mut self, h: Handle) -> Option<T> {
        let target = h.raw();
        if !self.nodes.contains_key(target) {
            return None;
        }
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(k) = cursor {
            if k == target {
                return self.unlink(prev, k);
            }
            prev = Some(k);
            cursor = self.nodes.get(k).and_then(|n| n.next);
        }
        None
    }

    /// Remove the first element matching `predicate` and release it.
    pub fn delete_by<P>(&mut self, mut predicate: P) -> Result<()>
    where
        P: FnMut(&T) -> bool,
    {
        let found = {
            let _g = self.guard.open("delete_by");
            self.find_raw(&mut predicate)
        };
        let (prev, k) = found.ok_or(Error::NotFound)?;
        let element = self.unlink(prev, k).ok_or(Error::NotFound)?;
        self.ops.release(element);
        Ok(())
    }

    /// Release every element, then the list itself.
    pub fn destroy(self) {
        drop(self);
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            nodes: &self.nodes,
            cursor: self.head,
            remaining: self.nodes.len(),
        }
    }

    // Returns (predecessor, match).
    fn find_raw<P>(&self, predicate: &mut P) -> Option<(Option<DefaultKey>, DefaultKey)>
    where
        P: FnMut(&T) -> bool,
    {
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(k) = cursor {
            let node = self.nodes.get(k)?;
            if predicate(&node.element) {
                return Some((prev, k));
            }
            prev = Some(k);
            cursor = node.next;
        }
        None
    }

    fn unlink(&mut self, prev: Option<DefaultKey>, k: DefaultKey) -> Option<T> {
        let node = self.nodes.remove(k)?;
        match prev {
            Some(p) => {
                if let Some(pn) = self.nodes.get_mut(p) {
                    pn.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        if self.tail == Some(k) {
            self.tail = prev;
        }
        Some(node.element)
    }
}

impl<T, O> LinkedList<T, O>
where
    O: Release<T> + Equivalence<T>,
{
    /// Remove the first element equal to `element` under the list's
    /// equality and release it. O(n).
    pub fn delete(&mut self, element: &T) -> Result<()> {
        if self.is_empty() {
            return Err(Error::NotFound);
        }
        let found = {
            let _g = self.guard.open("delete");
            let ops = &self.ops;
            self.find_raw(&mut |e: &T| ops.equal(element, e))
        };
        let (prev, k) = found.ok_or(Error::NotFound)?;
        let removed = self.unlink(prev, k).ok_or(Error::NotFound)?;
        self.ops.release(removed);
        Ok(())
    }
}

impl<T, O> LinkedList<T, O>
where
    O: Release<T> + Render<T>,
{
    /// Render every element in order, one per line.
    pub fn display(&self, out: &mut dyn fmt::Write) -> Result<()> {
        let _g = self.guard.open("display");
        self.render_elements(out)?;
        Ok(())
    }

    pub(crate) fn render_elements(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        for e in self.iter() {
            self.ops.render(e, out)?;
            out.write_char('\n')?;
        }
        Ok(())
    }
}

impl<T, O> Drop for LinkedList<T, O>
where
    O: Release<T>,
{
    fn drop(&mut self) {
        let mut cursor = self.head.take();
        self.tail = None;
        while let Some(k) = cursor {
            match self.nodes.remove(k) {
                Some(node) => {
                    cursor = node.next;
                    self.ops.release(node.element);
                }
                None => break,
            }
        }
    }
}

impl<'a, T, O> IntoIterator for &'a LinkedList<T, O>
where
    O: Release<T>,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug, O> fmt::Debug for LinkedList<T, O>
where
    O: Release<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::StdOps;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn list() -> LinkedList<i32, StdOps> {
        LinkedList::new(StdOps::default())
    }

    fn walk<T, O: Release<T>>(l: &LinkedList<T, O>) -> usize {
        let mut n = 0;
        let mut h = l.first();
        while let Some(cur) = h {
            n += 1;
            h = l.next(cur);
        }
        n
    }

    /// Records every released element.
    #[derive(Clone, Default)]
    struct Recording {
        released: Rc<RefCell<Vec<i32>>>,
    }
    impl Release<i32> for Recording {
        fn release(&self, item: i32) {
            self.released.borrow_mut().push(item);
        }
    }
    impl Equivalence<i32> for Recording {
        fn equal(&self, a: &i32, b: &i32) -> bool {
            a == b
        }
    }

    /// Invariant: append keeps insertion order and `len` matches the
    /// number of nodes reachable from `first` via `next`.
    #[test]
    fn append_preserves_order_and_length() {
        let mut l = list();
        assert!(l.is_empty());
        assert!(l.first().is_none());
        for v in [3, 1, 2] {
            l.append(v);
        }
        assert_eq!(l.iter().copied().collect::<Vec<_>>(), vec![3, 1, 2]);
        assert_eq!(l.len(), 3);
        assert_eq!(walk(&l), 3);
    }

    /// Invariant: delete removes only the first equal element and fixes
    /// head/tail links for every position.
    #[test]
    fn delete_first_match_at_head_middle_tail() {
        let mut l = list();
        for v in [1, 2, 3, 2, 4] {
            l.append(v);
        }
        l.delete(&2).unwrap();
        assert_eq!(l.iter().copied().collect::<Vec<_>>(), vec![1, 3, 2, 4]);
        l.delete(&1).unwrap();
        l.delete(&4).unwrap();
        assert_eq!(l.iter().copied().collect::<Vec<_>>(), vec![3, 2]);

        // Tail was fixed: appending lands after the new tail.
        l.append(9);
        assert_eq!(l.iter().copied().collect::<Vec<_>>(), vec![3, 2, 9]);
        assert_eq!(walk(&l), l.len());
    }

    /// Invariant: deleting from an empty list or a missing element is
    /// NotFound and changes nothing.
    #[test]
    fn delete_missing_is_not_found() {
        let mut l = list();
        assert_eq!(l.delete(&1), Err(Error::NotFound));
        l.append(1);
        assert_eq!(l.delete(&5), Err(Error::NotFound));
        assert_eq!(l.len(), 1);
    }

    /// Invariant: removing the only node empties head and tail together.
    #[test]
    fn removing_last_node_resets_head_and_tail() {
        let mut l = list();
        let h = l.append(7);
        assert_eq!(l.remove(h), Some(7));
        assert!(l.first().is_none());
        assert!(l.is_empty());
        let h2 = l.append(8);
        assert_eq!(l.first(), Some(h2));
        assert_eq!(l.next(h2), None);
    }

    /// Invariant: search uses the caller's predicate, not the list equality.
    #[test]
    fn search_by_derived_key() {
        let mut l: LinkedList<(String, u32), Plain> = LinkedList::new(Plain);
        l.append(("rick".into(), 70));
        l.append(("morty".into(), 14));
        let found = l.search("morty", |(name, _), k: &str| name == k);
        assert_eq!(found.map(|(_, age)| *age), Some(14));
        assert!(l.search("beth", |(name, _), k: &str| name == k).is_none());
    }

    struct Plain;
    impl Release<(String, u32)> for Plain {}

    /// Invariant: a handle to a removed node never resolves, even if its
    /// slot is reused by a later append.
    #[test]
    fn stale_handle_does_not_alias_new_node() {
        let mut l = list();
        let h1 = l.append(1);
        l.append(2);
        assert_eq!(l.remove(h1), Some(1));
        let h3 = l.append(3);
        assert_ne!(h1, h3);
        assert_eq!(l.get(h1), None);
        assert_eq!(l.next(h1), None);
        assert_eq!(l.remove(h1), None);
        assert_eq!(l.get(h3), Some(&3));
    }

    /// Invariant: element_at is 0-based and rejects out-of-range indexes.
    #[test]
    fn element_at_bounds() {
        let mut l = list();
        l.append(10);
        l.append(20);
        assert_eq!(l.element_at(0), Ok(&10));
        assert_eq!(l.element_at(1), Ok(&20));
        assert_eq!(
            l.element_at(2),
            Err(Error::IndexOutOfRange { index: 2, len: 2 })
        );
    }

    /// Invariant: delete and drop release each element exactly once; remove
    /// hands ownership back without releasing.
    #[test]
    fn release_runs_once_per_element() {
        let ops = Recording::default();
        let released = ops.released.clone();
        let mut l = LinkedList::new(ops);
        for v in 1..=4 {
            l.append(v);
        }
        l.delete(&2).unwrap();
        assert_eq!(*released.borrow(), vec![2]);

        let h = l.find(|&e| e == 3).unwrap();
        assert_eq!(l.remove(h), Some(3));
        assert_eq!(*released.borrow(), vec![2]);

        l.destroy();
        assert_eq!(*released.borrow(), vec![2, 1, 4]);
    }

    /// Invariant: get_mut edits in place and display renders in order.
    #[test]
    fn get_mut_and_display() {
        let mut l = list();
        let h = l.append(1);
        l.append(2);
        *l.get_mut(h).unwrap() = 5;
        let mut out = String::new();
        l.display(&mut out).unwrap();
        assert_eq!(out, "5\n2\n");
        assert_eq!(format!("{:?}", l), "[5, 2]");
    }

    /// Invariant (debug-only): a search predicate that re-enters the same
    /// list panics instead of observing a half-walked chain, and the panic
    /// names the inner and outer operations.
    #[cfg(debug_assertions)]
    #[test]
    fn nested_search_panics_in_debug() {
        let mut l = list();
        l.append(1);
        l.append(2);
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = l.search(&2, |e, k| l.find(|x| x == k).is_some() && e == k);
        }));
        let payload = res.expect_err("expected reentrancy to panic in debug builds");
        let msg = payload.downcast_ref::<String>().cloned().unwrap_or_default();
        assert!(msg.contains("`find` called during `search`"), "{}", msg);

        // The outer scan closed during unwinding; the list is usable again.
        assert_eq!(l.search(&1, |e, k| e == k), Some(&1));
    }
}
