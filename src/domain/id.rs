//! Task ID generation
//!
//! Each [`crate::Agent`] owns its own generator so multiple agents can share
//! a process without colliding on task IDs.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter handing out fresh task identifiers.
///
/// Scoped per-agent rather than process-global (see Design Notes in the
/// specification this crate implements): an `Agent` constructs one
/// `IdGenerator` and every task it creates, directly or via the planner,
/// draws from it.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { next: AtomicU64::new(1) }
    }

    /// Returns a fresh, previously-unissued ID.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_unique() {
        let gen = IdGenerator::new();
        let ids: Vec<u64> = (0..100).map(|_| gen.next_id()).collect();
        for w in ids.windows(2) {
            assert!(w[1] > w[0]);
        }
    }

    #[test]
    fn two_generators_are_independent() {
        let a = IdGenerator::new();
        let b = IdGenerator::new();
        assert_eq!(a.next_id(), b.next_id());
    }
}
