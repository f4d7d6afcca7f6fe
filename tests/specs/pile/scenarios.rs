//! Association pile scenario specs
//!
//! Each scenario runs against both pile implementations.

use crate::prelude::*;
use std::collections::HashSet;
use std::sync::Mutex;

#[test]
fn same_key_is_held_until_release() {
    for (label, pile) in piles::<Item>() {
        pile.add(Keyed::with_key(1, "A")).unwrap();
        pile.add(Keyed::with_key(1, "B")).unwrap();
        pile.add(Keyed::with_key(2, "C")).unwrap();

        let a = pile.poll().unwrap();
        assert_eq!(*a.value(), "A", "{label}");

        // B is contended until A is released; C may come out
        assert_eq!(value_of(pile.poll()), Some("C"), "{label}");
        assert_eq!(pile.poll(), None, "{label}");

        pile.release(&a).unwrap();
        assert_eq!(value_of(pile.poll()), Some("B"), "{label}");
        assert_eq!(pile.size(), 0, "{label}");
    }
}

#[test]
fn all_holds_back_later_associated_items() {
    for (label, pile) in piles::<Item>() {
        pile.add(Keyed::all("A")).unwrap();
        pile.add(Keyed::with_key(5, "B")).unwrap();

        let a = pile.poll().unwrap();
        assert_eq!(*a.value(), "A", "{label}");
        assert_eq!(pile.poll(), None, "{label}");
        assert_eq!(pile.size(), 1, "{label}");

        pile.release(&a).unwrap();
        assert_eq!(value_of(pile.poll()), Some("B"), "{label}");
    }
}

#[test]
fn unassociated_items_ignore_all() {
    for (label, pile) in piles::<Item>() {
        pile.add(Keyed::all("ALL")).unwrap();
        pile.add(Keyed::unassociated("U")).unwrap();

        let all = pile.poll().unwrap();
        assert_eq!(*all.value(), "ALL", "{label}");
        assert_eq!(value_of(pile.poll()), Some("U"), "{label}");
        pile.release(&all).unwrap();
    }
}

#[test]
fn releasing_what_was_never_polled_fails() {
    for (label, pile) in piles::<Item>() {
        pile.add(Keyed::with_key(1, "A")).unwrap();
        assert!(pile.release(&Keyed::with_key(2, "X")).is_err(), "{label}");
        assert!(pile.release(&Keyed::all("X")).is_err(), "{label}");
    }
}

/// What workers currently hold
#[derive(Default)]
struct InFlight {
    keys: HashSet<u32>,
    all: bool,
}

#[test]
fn workers_respect_exclusion_under_contention() {
    const ITEMS: u32 = 400;

    for (label, pile) in piles::<Keyed<u32, u32>>() {
        let pile: Arc<dyn AssociationPile<Keyed<u32, u32>>> = Arc::from(pile);
        for i in 0..ITEMS {
            let item = match i % 10 {
                0 => Keyed::all(i),
                1 | 2 => Keyed::unassociated(i),
                _ => Keyed::with_key(i % 5, i),
            };
            pile.add(item).unwrap();
        }

        let in_flight = Arc::new(Mutex::new(InFlight::default()));
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let pile = Arc::clone(&pile);
                let in_flight = Arc::clone(&in_flight);
                thread::spawn(move || {
                    let mut done = 0;
                    while pile.size() > 0 {
                        let Some(item) = pile.poll() else {
                            thread::yield_now();
                            continue;
                        };
                        let association = item.association();
                        {
                            let mut held = in_flight.lock().unwrap();
                            match &association {
                                Association::None => {}
                                Association::Key(key) => {
                                    assert!(!held.all, "key {key} polled while ALL held");
                                    assert!(held.keys.insert(*key), "key {key} polled twice");
                                }
                                Association::All => {
                                    assert!(!held.all, "two ALLs in flight");
                                    assert!(held.keys.is_empty(), "ALL polled while keys held");
                                    held.all = true;
                                }
                            }
                        }
                        thread::yield_now();
                        {
                            let mut held = in_flight.lock().unwrap();
                            match &association {
                                Association::None => {}
                                Association::Key(key) => {
                                    held.keys.remove(key);
                                }
                                Association::All => held.all = false,
                            }
                        }
                        pile.release(&item).unwrap();
                        done += 1;
                    }
                    done
                })
            })
            .collect();

        let total: u32 = workers.into_iter().map(|w| w.join().unwrap()).sum();
        assert_eq!(total, ITEMS, "{label}");
    }
}
