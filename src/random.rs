//! Standard-normal random sources
//!
//! Every simulated unit owns its own source. Sources are seeded explicitly so
//! a run is reproducible from its seed alone.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

/// Producer of independent N(0, 1) deviates.
pub trait RandomSource {
    fn next_standard_normal(&mut self) -> f64;
}

impl<S: RandomSource + ?Sized> RandomSource for Box<S> {
    fn next_standard_normal(&mut self) -> f64 {
        (**self).next_standard_normal()
    }
}

/// Box-Muller transform over a uniform generator.
///
/// Only the cosine branch is used, so every call consumes two uniforms.
#[derive(Debug, Clone)]
pub struct BoxMuller<R> {
    rng: R,
}

impl<R: Rng> BoxMuller<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Uniform draw on (0, 1); `gen` yields [0, 1) so zero is rejected.
    fn open_uniform(&mut self) -> f64 {
        loop {
            let u: f64 = self.rng.gen();
            if u > 0.0 {
                return u;
            }
        }
    }
}

impl BoxMuller<ChaCha8Rng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomSource for BoxMuller<R> {
    fn next_standard_normal(&mut self) -> f64 {
        let u = self.open_uniform();
        let v = self.open_uniform();
        (-2.0 * u.ln()).sqrt() * (std::f64::consts::TAU * v).cos()
    }
}

/// Ziggurat sampler from `rand_distr`.
#[derive(Debug, Clone)]
pub struct Ziggurat<R> {
    rng: R,
}

impl<R: Rng> Ziggurat<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl Ziggurat<ChaCha8Rng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomSource for Ziggurat<R> {
    fn next_standard_normal(&mut self) -> f64 {
        StandardNormal.sample(&mut self.rng)
    }
}

/// Hands out independent sub-seeds derived from one run seed.
///
/// Each call to [`SeedStream::next_seed`] seeds a fresh source, so no two
/// simulated units ever share generator state.
#[derive(Debug, Clone)]
pub struct SeedStream {
    rng: StdRng,
}

impl SeedStream {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_seed(&mut self) -> u64 {
        self.rng.gen()
    }

    pub fn next_source(&mut self) -> BoxMuller<ChaCha8Rng> {
        BoxMuller::seeded(self.next_seed())
    }
}
