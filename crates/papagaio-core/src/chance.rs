//! Injectable randomness.
//!
//! Every random decision the bot makes (phrase index, modality, coordinates)
//! goes through [`Chance`], so tests can script the outcome.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform random draws.
pub trait Chance: Send {
    /// Uniform integer in `0..n`. `n` must be non-zero.
    fn below(&mut self, n: usize) -> usize;

    /// Uniform float in `[0, 1)`.
    fn unit(&mut self) -> f64;
}

/// Production [`Chance`] backed by a `StdRng`.
pub struct RandomChance {
    rng: StdRng,
}

impl RandomChance {
    /// Seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence, for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomChance {
    fn default() -> Self {
        Self::new()
    }
}

impl Chance for RandomChance {
    fn below(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}
