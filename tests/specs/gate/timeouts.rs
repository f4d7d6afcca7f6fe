//! Gate timeout specs
//!
//! Timeouts are ordinary outcomes: they return false and leave no trace.

use crate::prelude::*;

#[test]
fn enter_times_out_on_closed_gate() {
    let gate = Arc::new(NonReentrantGate::new());
    assert!(gate.close(Timeout::NONE).unwrap());

    let other = Arc::clone(&gate);
    let (entered, elapsed) = thread::spawn(move || {
        let start = Instant::now();
        (other.enter(Timeout::from_millis(50)).unwrap(), start.elapsed())
    })
    .join()
    .unwrap();

    assert!(!entered);
    assert!(elapsed >= Duration::from_millis(40));
    assert_eq!(gate.active_count(), 0);
    gate.open().unwrap();
}

#[test]
fn close_timeout_rolls_back_to_open() {
    let gate = Arc::new(ReentrantGate::new());
    let entered = Arc::new(Barrier::new(2));
    let leave = Arc::new(Barrier::new(2));

    let insider = {
        let gate = Arc::clone(&gate);
        let entered = Arc::clone(&entered);
        let leave = Arc::clone(&leave);
        thread::spawn(move || {
            let _entered = gate.enter_scoped().unwrap();
            entered.wait();
            leave.wait();
        })
    };

    entered.wait();
    assert!(!gate.close(Timeout::from_millis(20)).unwrap());
    assert_eq!(gate.status(), GateStatus::Open);

    // others can still get in after the failed close
    let other = Arc::clone(&gate);
    let got_in = thread::spawn(move || other.try_enter_scoped(Timeout::NONE).unwrap().is_some())
        .join()
        .unwrap();
    assert!(got_in);

    leave.wait();
    insider.join().unwrap();
}

#[test]
fn zero_timeout_never_waits() {
    let gate = Arc::new(ReentrantGate::new());
    let _closed = gate.close_scoped().unwrap();

    let other = Arc::clone(&gate);
    let elapsed = thread::spawn(move || {
        let start = Instant::now();
        assert!(!other.enter(Timeout::NONE).unwrap());
        assert!(!other.close(Timeout::NONE).unwrap());
        assert!(!other.bar_entry(Timeout::NONE).unwrap());
        start.elapsed()
    })
    .join()
    .unwrap();
    assert!(elapsed < Duration::from_secs(1));
}
