//! Gate exclusion specs
//!
//! Closing waits for everyone else to leave, and only the closer may act
//! while the gate is closed.

use crate::prelude::*;

/// Three threads: T1 closes while T2 and T3 are inside.
fn close_waits_for_entered_threads<G>(gate: Arc<G>)
where
    G: Gate + 'static,
{
    let entered = Arc::new(Barrier::new(3));
    let leave = Arc::new(Barrier::new(3));

    let insiders: Vec<_> = (0..2)
        .map(|_| {
            let gate = Arc::clone(&gate);
            let entered = Arc::clone(&entered);
            let leave = Arc::clone(&leave);
            thread::spawn(move || {
                assert!(gate.enter(Timeout::Infinite).unwrap());
                entered.wait();
                leave.wait();
                gate.exit().unwrap();
                gate.is_closed_by_current_thread()
            })
        })
        .collect();

    // wait for both insiders before T1 starts closing
    wait_until("both insiders to enter", || gate.active_count() == 2);

    let closer = {
        let gate = Arc::clone(&gate);
        thread::spawn(move || {
            entered.wait();
            let closed = gate.close(Timeout::Infinite).unwrap();
            let by_me = gate.is_closed_by_current_thread();
            gate.open().unwrap();
            (closed, by_me)
        })
    };

    // the close cannot complete while T2 and T3 are inside
    thread::sleep(Duration::from_millis(30));
    assert!(!gate.is_closed());
    leave.wait();

    let (closed, by_closer) = closer.join().unwrap();
    assert!(closed);
    assert!(by_closer);
    for insider in insiders {
        assert!(!insider.join().unwrap());
    }
    assert_eq!(gate.active_count(), 0);
}

#[test]
fn reentrant_close_blocks_until_all_others_exit() {
    close_waits_for_entered_threads(Arc::new(ReentrantGate::new()));
}

#[test]
fn non_reentrant_close_blocks_until_all_others_exit() {
    close_waits_for_entered_threads(Arc::new(NonReentrantGate::new()));
}

#[test]
fn closer_enters_without_blocking_while_others_wait() {
    let gate = Arc::new(ReentrantGate::new());
    assert!(gate.close(Timeout::Infinite).unwrap());

    let waiter = {
        let gate = Arc::clone(&gate);
        thread::spawn(move || {
            assert!(gate.enter(Timeout::Infinite).unwrap());
            gate.exit().unwrap();
        })
    };

    // the closer re-enters freely
    assert!(gate.enter(Timeout::NONE).unwrap());
    gate.exit().unwrap();

    thread::sleep(Duration::from_millis(30));
    assert!(!waiter.is_finished());
    gate.open().unwrap();

    waiter.join().unwrap();
    assert_eq!(gate.active_count(), 0);
}

#[test]
fn active_count_returns_after_matched_pairs() {
    let gate = Arc::new(ReentrantGate::new());
    let workers: Vec<_> = (0..8)
        .map(|i| {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                for _ in 0..100 {
                    for _ in 0..=(i % 3) {
                        assert!(gate.enter(Timeout::Infinite).unwrap());
                    }
                    for _ in 0..=(i % 3) {
                        gate.exit().unwrap();
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(gate.active_count(), 0);
}

#[test]
fn close_never_overlaps_shared_entry() {
    let gate = Arc::new(ReentrantGate::new());
    let closers_inside = Arc::new(std::sync::atomic::AtomicUsize::new(0));

    let workers: Vec<_> = (0..6)
        .map(|i| {
            let gate = Arc::clone(&gate);
            let closers_inside = Arc::clone(&closers_inside);
            thread::spawn(move || {
                use std::sync::atomic::Ordering;
                for _ in 0..200 {
                    if i == 0 {
                        let _closed = gate.close_scoped().unwrap();
                        closers_inside.store(1, Ordering::SeqCst);
                        thread::yield_now();
                        closers_inside.store(0, Ordering::SeqCst);
                    } else {
                        let _entered = gate.enter_scoped().unwrap();
                        assert_eq!(closers_inside.load(Ordering::SeqCst), 0);
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(gate.status(), GateStatus::Open);
}
