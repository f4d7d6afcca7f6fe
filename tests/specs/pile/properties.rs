//! Association pile properties over random operation sequences

use crate::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeMap;

type Element = Keyed<u8, u32>;

#[derive(Clone, Debug)]
enum Op {
    /// 0 = unassociated, 1 = ALL, otherwise a key
    Add(u8),
    Poll,
    Release(prop::sample::Index),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..6).prop_map(Op::Add),
        3 => Just(Op::Poll),
        2 => any::<prop::sample::Index>().prop_map(Op::Release),
    ]
}

fn element(selector: u8, id: u32) -> Element {
    match selector {
        0 => Keyed::unassociated(id),
        1 => Keyed::all(id),
        key => Keyed::with_key(key, id),
    }
}

/// Tracks what the pile holds and what callers hold, and checks every poll.
#[derive(Default)]
struct Model {
    next_id: u32,
    /// Added and not yet polled, by id
    queued: BTreeMap<u32, Association<u8>>,
    outstanding: Vec<Element>,
}

impl Model {
    fn check_poll(&mut self, item: &Element) -> Result<(), TestCaseError> {
        let id = *item.value();
        let association = item.association();
        prop_assert!(self.queued.remove(&id).is_some(), "{} polled twice", id);

        let outstanding: Vec<_> = self.outstanding.iter().map(|e| e.association()).collect();
        match &association {
            Association::None => {}
            Association::Key(_) => {
                prop_assert!(!outstanding.contains(&association), "key already in flight");
                prop_assert!(!outstanding.contains(&Association::All), "key polled under ALL");
            }
            Association::All => {
                prop_assert!(
                    outstanding.iter().all(Association::is_none),
                    "ALL polled with associated items in flight"
                );
            }
        }

        if !association.is_none() {
            // FIFO within an association
            let earlier = self
                .queued
                .range(..id)
                .any(|(_, queued)| *queued == association);
            prop_assert!(!earlier, "{} overtook an earlier item of {}", id, association);
        }
        Ok(())
    }
}

fn exercise(pile: &dyn AssociationPile<Element>, ops: &[Op]) -> Result<(), TestCaseError> {
    let mut model = Model::default();

    for op in ops {
        match op {
            Op::Add(selector) => {
                let item = element(*selector, model.next_id);
                model.queued.insert(model.next_id, item.association());
                model.next_id += 1;
                prop_assert!(pile.add(item).unwrap());
            }
            Op::Poll => {
                let available = pile.is_available();
                if let Some(item) = pile.poll() {
                    prop_assert!(available, "poll succeeded while reported unavailable");
                    model.check_poll(&item)?;
                    model.outstanding.push(item);
                }
            }
            Op::Release(index) => {
                if !model.outstanding.is_empty() {
                    let item = model.outstanding.remove(index.index(model.outstanding.len()));
                    pile.release(&item).unwrap();
                }
            }
        }
        prop_assert_eq!(pile.size(), model.queued.len());
    }

    // release everything and drain: nothing may be stranded
    for item in std::mem::take(&mut model.outstanding) {
        pile.release(&item).unwrap();
    }
    while let Some(item) = pile.poll() {
        model.check_poll(&item)?;
        pile.release(&item).unwrap();
    }
    prop_assert!(model.queued.is_empty(), "stranded: {:?}", model.queued);
    prop_assert_eq!(pile.size(), 0);
    Ok(())
}

proptest! {
    #[test]
    fn simple_pile_upholds_exclusion(ops in prop::collection::vec(op(), 1..120)) {
        exercise(&SimpleAssociationPile::new(), &ops)?;
    }

    #[test]
    fn concurrent_pile_upholds_exclusion(
        ops in prop::collection::vec(op(), 1..120),
        variance in 0u64..6,
    ) {
        let pile = ConcurrentAssociationPile::with_config(
            PileConfig::new().with_unfairness_variance(variance),
        );
        exercise(&pile, &ops)?;
    }
}
