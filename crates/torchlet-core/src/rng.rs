//! Seedable pseudo-random source for initializers.

use std::sync::OnceLock;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::dtype::FloatElement;

/// A seedable random engine.
///
/// Two generators created with the same seed produce identical draws.
pub struct Generator {
    seed: u64,
    rng: StdRng,
}

static GLOBAL: OnceLock<Mutex<Generator>> = OnceLock::new();

impl Generator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seed from the operating system's entropy source.
    pub fn from_entropy() -> Self {
        Self::new(rand::thread_rng().next_u64())
    }

    /// Reset the engine to the start of the stream for `seed`.
    pub fn manual_seed(&mut self, seed: u64) {
        tracing::debug!(seed, "generator reseeded");
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// The seed this generator was last (re)seeded with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Run `f` with exclusive access to the process-wide generator.
    ///
    /// The global generator is seeded from entropy on first use.
    pub fn with_global<R>(f: impl FnOnce(&mut Generator) -> R) -> R {
        let global = GLOBAL.get_or_init(|| Mutex::new(Generator::from_entropy()));
        f(&mut global.lock())
    }

    /// Draw from the uniform distribution on `[low, high)`.
    pub fn uniform<T: FloatElement>(&mut self, low: T, high: T) -> T {
        let u = T::cast_f64(self.rng.gen::<f64>());
        low + (high - low) * u
    }

    /// Draw from the normal distribution N(mean, std²).
    pub fn normal<T: FloatElement>(&mut self, mean: T, std: T) -> T {
        // Box-Muller transform
        let u1 = 1.0 - self.rng.gen::<f64>();
        let u2 = self.rng.gen::<f64>();
        let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
        mean + std * T::cast_f64(z)
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator").field("seed", &self.seed).finish()
    }
}
