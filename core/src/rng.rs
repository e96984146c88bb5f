//! Deterministic random number generation for sample data.
//!
//! RULE: The sample generator never touches a platform RNG. Every draw
//! flows through a `DeskRng` derived from one seed, so the same seed always
//! produces the same snapshot.
//!
//! Each stream gets its own RNG, seeded from (seed XOR stream index), so
//! adding a stream never shifts the others.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub struct DeskRng {
    pub stream: SampleStream,
    inner: Pcg64Mcg,
}

impl DeskRng {
    pub fn new(seed: u64, stream: SampleStream) -> Self {
        let derived_seed = seed ^ (stream as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            stream,
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform pick from a non-empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        let i = self.next_u64_below(items.len() as u64) as usize;
        &items[i]
    }

    /// Pick an index by relative weight.
    pub fn weighted_index(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        let mut roll = self.next_f64() * total;
        for (i, w) in weights.iter().enumerate() {
            if roll < *w {
                return i;
            }
            roll -= w;
        }
        weights.len() - 1
    }

    /// A version-4 UUID built from this stream's bytes.
    pub fn next_uuid(&mut self) -> uuid::Uuid {
        let mut bytes = [0u8; 16];
        self.inner.fill_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}

/// Stable stream assignments.
/// NEVER reorder or remove entries — only append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum SampleStream {
    Identity = 0,
    Classification = 1,
    Location = 2,
    Lifecycle = 3,
    Votes = 4,
}
