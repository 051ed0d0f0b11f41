#![cfg(test)]

// Property tests for LinkedList kept inside the crate so the cursor walk
// can be checked against node links directly.

use crate::capability::{Equivalence, Release};
use crate::error::Error;
use crate::linked_list::LinkedList;
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

// Records every released element so single release can be checked.
#[derive(Clone, Default)]
struct Tally(Rc<RefCell<Vec<u8>>>);
impl Release<u8> for Tally {
    fn release(&self, item: u8) {
        self.0.borrow_mut().push(item);
    }
}
impl Equivalence<u8> for Tally {
    fn equal(&self, a: &u8, b: &u8) -> bool {
        a == b
    }
}

#[derive(Clone, Debug)]
enum Op {
    Append(u8),
    Delete(u8),
    Search(u8),
    ElementAt(usize),
}

// Small value range so deletes and searches hit repeated elements often.
fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        3 => (0u8..8).prop_map(Op::Append),
        2 => (0u8..8).prop_map(Op::Delete),
        1 => (0u8..8).prop_map(Op::Search),
        1 => (0usize..12).prop_map(Op::ElementAt),
    ];
    proptest::collection::vec(op, 1..80)
}

// Property: state-machine equivalence against a Vec.
// - append adds at the tail; delete removes the first equal element only.
// - Deleting a missing element fails and changes nothing.
// - Walking first/next visits exactly len() nodes, in model order.
// - Every deleted element is released once; destroy releases the rest.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_list_matches_vec(ops in arb_ops()) {
        let tally = Tally::default();
        let mut sut = LinkedList::new(tally.clone());
        let mut model: Vec<u8> = Vec::new();
        let mut released: Vec<u8> = Vec::new();

        for op in ops {
            match op {
                Op::Append(v) => {
                    sut.append(v);
                    model.push(v);
                }
                Op::Delete(v) => {
                    let res = sut.delete(&v);
                    match model.iter().position(|&m| m == v) {
                        Some(i) => {
                            prop_assert_eq!(res, Ok(()));
                            model.remove(i);
                            released.push(v);
                        }
                        None => prop_assert_eq!(res, Err(Error::NotFound)),
                    }
                }
                Op::Search(v) => {
                    let found = sut.search(&v, |e, k| e == k).copied();
                    prop_assert_eq!(found, model.iter().find(|&&m| m == v).copied());
                }
                Op::ElementAt(i) => {
                    match model.get(i) {
                        Some(&m) => prop_assert_eq!(sut.element_at(i), Ok(&m)),
                        None => prop_assert_eq!(
                            sut.element_at(i),
                            Err(Error::IndexOutOfRange { index: i, len: model.len() })
                        ),
                    }
                }
            }

            let mut walked = Vec::new();
            let mut cursor = sut.first();
            while let Some(h) = cursor {
                walked.push(*sut.get(h).expect("cursor resolves"));
                cursor = sut.next(h);
            }
            prop_assert_eq!(walked.len(), sut.len());
            prop_assert_eq!(&walked, &model);
            prop_assert_eq!(sut.is_empty(), model.is_empty());
            prop_assert_eq!(&*tally.0.borrow(), &released);
        }

        sut.destroy();
        released.extend(model.iter().copied());
        prop_assert_eq!(&*tally.0.borrow(), &released);
    }
}
