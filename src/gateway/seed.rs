//! Seed derivation for single and batched generations

use rand::Rng;

/// Random seeds stay within the integer range JSON clients represent exactly.
pub const MAX_RANDOM_SEED: u64 = (1 << 53) - 1;

/// Generator state handed to a backend. Same seed, same output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorState {
    seed: u64,
}

impl GeneratorState {
    pub fn from_seed(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// A fixed seed yields `seed + batch_index`; no seed draws independently for every index.
pub fn derive_seed(requested: Option<u64>, batch_index: u32) -> GeneratorState {
    let seed = match requested {
        Some(seed) => seed.wrapping_add(u64::from(batch_index)),
        None => rand::thread_rng().gen_range(0..=MAX_RANDOM_SEED),
    };
    GeneratorState::from_seed(seed)
}
