//! Sampling utilities for the consensus loop.
//!
//! Minimal samples are drawn without replacement by walking a shuffled
//! permutation of all point indices with a cursor. Consecutive draws are
//! therefore disjoint until the permutation is exhausted, at which point the
//! sequence reshuffles and starts over.

use rand::seq::SliceRandom;
use rand::Rng;

/// A shuffled permutation of `[0, count)` with a draw cursor.
///
/// The generator is passed into each call rather than owned, so one seeded
/// `StdRng` can drive both the sequence and any other randomized step of a
/// run.
#[derive(Debug, Clone)]
pub struct SampleSequence {
    indices: Vec<usize>,
    cursor: usize,
}

impl SampleSequence {
    /// Create a freshly shuffled permutation of `[0, count)`.
    pub fn new<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Self {
        let mut indices: Vec<usize> = (0..count).collect();
        indices.shuffle(rng);
        Self { indices, cursor: 0 }
    }

    /// Number of indices in the underlying permutation.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True when the permutation is empty.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Draw the next block of `len` indices, reshuffling when fewer than
    /// `len` undrawn indices remain.
    ///
    /// `len` must not exceed [`len`](Self::len); the driver guarantees this
    /// by failing fast when the minimal sample size exceeds the point count.
    pub fn next_block<R: Rng + ?Sized>(&mut self, len: usize, rng: &mut R) -> &[usize] {
        debug_assert!(len <= self.indices.len());
        if self.cursor + len > self.indices.len() {
            self.indices.shuffle(rng);
            self.cursor = 0;
        }
        let block = &self.indices[self.cursor..self.cursor + len];
        self.cursor += len;
        block
    }
}
