//! Seedable random source shared by the reference strategies.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, MutexGuard};

/// A `StdRng` behind a mutex so `&self` strategies can draw from it.
///
/// The lock is only held for a single draw and never across an await point.
#[derive(Debug)]
pub struct SharedRng {
    inner: Mutex<StdRng>,
}

impl SharedRng {
    /// Deterministic source for reproducible runs and tests.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Source seeded from operating system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            inner: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Seeded when a seed is given, entropy otherwise.
    #[must_use]
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }

    /// Uniform draw from `[0, 1)`.
    pub fn unit(&self) -> f64 {
        self.lock().random::<f64>()
    }

    /// Uniform draw from `[0, scale)`.
    pub fn scaled(&self, scale: f64) -> f64 {
        self.unit() * scale
    }

    fn lock(&self) -> MutexGuard<'_, StdRng> {
        // A poisoned lock still holds a usable generator.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
