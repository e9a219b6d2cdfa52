//! Deterministic RNG streams for the simulation.
//!
//! One user seed fans out into independent streams via HMAC-SHA256 domain
//! separation, so weather draws never perturb job-related draws and a
//! replayed session stays bit-stable no matter which subsystem consumed
//! randomness first.

use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use sha2::Sha256;
use std::cell::{RefCell, RefMut};

/// Per-domain RNG streams shared across one game session.
#[derive(Debug)]
pub struct RngBundle {
    weather: RefCell<CountingRng<SmallRng>>,
    jobs: RefCell<CountingRng<SmallRng>>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        let weather = CountingRng::new(derive_stream_seed(seed, b"weather"));
        let jobs = CountingRng::new(derive_stream_seed(seed, b"jobs"));
        Self {
            weather: RefCell::new(weather),
            jobs: RefCell::new(jobs),
        }
    }

    /// Access the weather RNG stream.
    #[must_use]
    pub fn weather(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.weather.borrow_mut()
    }

    /// Access the jobs RNG stream.
    #[must_use]
    pub fn jobs(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.jobs.borrow_mut()
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
