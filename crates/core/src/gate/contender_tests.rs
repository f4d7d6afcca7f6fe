// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn ids_are_unique() {
    let a = Token::new();
    let b = Token::new();
    let c = LiteContender::new();
    assert_ne!(a.id(), b.id());
    assert_ne!(b.id(), c.id());
}

#[test]
fn thread_id_is_stable_within_a_thread() {
    assert_eq!(ContenderId::current_thread(), ContenderId::current_thread());
}

#[test]
fn thread_ids_differ_across_threads() {
    let here = ContenderId::current_thread();
    let there = std::thread::spawn(ContenderId::current_thread).join().unwrap();
    assert_ne!(here, there);
}

#[test]
fn raw_zero_means_no_contender() {
    assert!(ContenderId::from_raw(0).is_none());
    let id = Token::new().id();
    assert_eq!(ContenderId::from_raw(id.as_raw()), Some(id));
}

#[test]
fn primary_gate_counts_inline() {
    let gate = GateId::next();
    let mut counts = EnterCounts::default();

    assert_eq!(counts.increment(gate), 1);
    assert_eq!(counts.increment(gate), 2);
    assert_eq!(counts.get(gate), 2);
    assert!(counts.others.is_empty());

    assert_eq!(counts.decrement(gate), Some(1));
    assert_eq!(counts.decrement(gate), Some(0));
    assert!(counts.primary.is_none());
}

#[test]
fn secondary_gates_spill_into_map() {
    let first = GateId::next();
    let second = GateId::next();
    let mut counts = EnterCounts::default();

    counts.increment(first);
    assert_eq!(counts.increment(second), 1);
    assert_eq!(counts.others.len(), 1);
    assert_eq!(counts.get(second), 1);

    assert_eq!(counts.decrement(second), Some(0));
    assert!(counts.others.is_empty());
    assert_eq!(counts.get(first), 1);
}

#[test]
fn spilled_gate_is_not_promoted_while_counted() {
    let first = GateId::next();
    let second = GateId::next();
    let mut counts = EnterCounts::default();

    counts.increment(first);
    counts.increment(second);
    counts.decrement(first);

    // the inline slot is free, but the second gate must keep its spilled count
    assert_eq!(counts.increment(second), 2);
    assert_eq!(counts.get(second), 2);
}

#[test]
fn decrement_of_unentered_gate_is_none() {
    let mut counts = EnterCounts::default();
    assert_eq!(counts.decrement(GateId::next()), None);
}

#[test]
fn contender_ref_reports_identity() {
    let mut token = Token::new();
    let id = token.id();
    let contender = ContenderRef::from(&mut token);
    assert_eq!(contender.id(), id);

    let mut lite = LiteContender::new();
    let id = lite.id();
    assert_eq!(ContenderRef::from(&mut lite).id(), id);
}

#[test]
fn display_names_contender() {
    let id = Token::new().id();
    assert_eq!(id.to_string(), format!("contender-{}", id.as_raw()));
}
