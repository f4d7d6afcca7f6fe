//! Shared helpers for the behavioral specs

pub use concord_core::{Gate, GateStatus, NonReentrantGate, ReentrantGate, Timeout};
pub use concord_pile::{
    Associated, Association, AssociationPile, ConcurrentAssociationPile, Keyed, PileConfig,
    SimpleAssociationPile,
};
pub use std::sync::{Arc, Barrier};
pub use std::thread;
pub use std::time::{Duration, Instant};

pub type Item = Keyed<u32, &'static str>;

/// Both pile implementations, labelled for assertion messages.
pub fn piles<T>() -> Vec<(&'static str, Box<dyn AssociationPile<T>>)>
where
    T: concord_pile::Associated + Send + Sync + 'static,
{
    vec![
        ("simple", Box::new(SimpleAssociationPile::new())),
        (
            "concurrent",
            Box::new(ConcurrentAssociationPile::with_config(
                PileConfig::new().with_unfairness_variance(4),
            )),
        ),
    ]
}

/// Spin until `condition` holds, failing after a generous deadline.
pub fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

pub fn value_of<T: Copy, K>(item: Option<Keyed<K, T>>) -> Option<T> {
    item.map(|i| *i.value())
}
