use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

/// Picks an index in `[0, n)`. Rules only ever draw randomness through this,
/// so a caller controls reproducibility by choosing the sampler.
pub trait IndexSampler {
    fn sample_index(&mut self, n: usize) -> usize;
}

/// Uniform sampling over an injected random source.
#[derive(Debug, Clone)]
pub struct UniformSampler<R: RngCore = SmallRng> {
    rng: R,
}

impl<R: RngCore> UniformSampler<R> {
    pub fn new(rng: R) -> Self {
        UniformSampler { rng }
    }
}

impl UniformSampler<SmallRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(SmallRng::from_entropy())
    }
}

impl<R: RngCore> IndexSampler for UniformSampler<R> {
    fn sample_index(&mut self, n: usize) -> usize {
        assert!(n > 0, "cannot sample from an empty range");
        self.rng.gen_range(0..n)
    }
}
