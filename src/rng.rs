//! Deterministic random numbers keyed by strings.
//!
//! The key is hashed with SHA-256 and the digest seeds a ChaCha8 stream, so the
//! same key yields bit-identical floats on every platform.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// Seeded stream of floats in `[0, 1)`.
#[derive(Clone, Debug)]
pub struct SeededRng {
    inner: ChaCha8Rng,
}

impl SeededRng {
    pub fn from_key(key: &str) -> Self {
        let digest = Sha256::digest(key.as_bytes());
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest);
        Self { inner: ChaCha8Rng::from_seed(seed) }
    }

    pub fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Uniform index in `0..n`. `n` must be positive.
    pub fn below(&mut self, n: usize) -> usize {
        let idx = (self.next_f64() * n as f64).floor() as usize;
        idx.min(n.saturating_sub(1))
    }
}

/// Seed key for a new attempt: `initialVariant|id|attemptNumber|parentAttempt`.
pub fn attempt_key(initial_variant: u64, id: &str, attempt_number: u32, parent_attempt: u32) -> String {
    format!("{initial_variant}|{id}|{attempt_number}|{parent_attempt}")
}

/// Seed key for shuffling a sequence: `initialVariant|id|attemptNumber`.
pub fn shuffle_key(initial_variant: u64, id: &str, attempt_number: u32) -> String {
    format!("{initial_variant}|{id}|{attempt_number}")
}

/// Seed key for deriving children's initial variants: `initialVariant|id`.
pub fn init_key(initial_variant: u64, id: &str) -> String {
    format!("{initial_variant}|{id}")
}
