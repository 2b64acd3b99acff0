//! Deterministic RNG streams segregated by simulation domain.
//!
//! Every random draw in the engine (event selection, chance rolls, child
//! generation) flows through one of these streams so a fixed user seed
//! replays identically regardless of which subsystems ran in between.

use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use sha2::Sha256;
use std::cell::{RefCell, RefMut};

/// Bundle of independent RNG streams derived from a single user seed.
#[derive(Debug, Clone)]
pub struct RngBundle {
    events: RefCell<CountingRng<SmallRng>>,
    outcome: RefCell<CountingRng<SmallRng>>,
    child: RefCell<CountingRng<SmallRng>>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            events: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"events"))),
            outcome: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"outcome"))),
            child: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"child"))),
        }
    }

    /// Access the event-selection RNG stream.
    #[must_use]
    pub fn events(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.events.borrow_mut()
    }

    /// Access the outcome-roll RNG stream.
    #[must_use]
    pub fn outcome(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.outcome.borrow_mut()
    }

    /// Access the child-simulation RNG stream.
    #[must_use]
    pub fn child(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.child.borrow_mut()
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes())
        .expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let seed_bytes: [u8; 8] = digest[..8].try_into().expect("digest slice length");
    u64::from_le_bytes(seed_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn streams_are_domain_separated() {
        let bundle = RngBundle::from_user_seed(42);
        let a: u64 = bundle.events().r#gen();
        let b: u64 = bundle.outcome().r#gen();
        assert_ne!(a, b);
    }

    #[test]
    fn same_seed_replays_identically() {
        let first = RngBundle::from_user_seed(7);
        let second = RngBundle::from_user_seed(7);
        let a: u64 = first.events().r#gen();
        let b: u64 = second.events().r#gen();
        assert_eq!(a, b);
        assert_eq!(first.events().draws(), 1);
    }

    #[test]
    fn draw_counter_tracks_usage() {
        let bundle = RngBundle::from_user_seed(9);
        let _: u32 = bundle.child().r#gen();
        let _: u32 = bundle.child().r#gen();
        assert_eq!(bundle.child().draws(), 2);
        assert_eq!(bundle.outcome().draws(), 0);
    }
}
