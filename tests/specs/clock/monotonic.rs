//! Safe clock specs

use crate::prelude::*;
use concord_core::SafeClock;

#[test]
fn global_clock_never_goes_backwards_on_any_thread() {
    let readers: Vec<_> = (0..4)
        .map(|_| {
            thread::spawn(|| {
                let clock = SafeClock::global();
                let mut previous = clock.now();
                for _ in 0..10_000 {
                    let now = clock.now();
                    assert!(now >= previous, "{previous} then {now}");
                    previous = now;
                }
            })
        })
        .collect();
    for reader in readers {
        reader.join().unwrap();
    }
}
