//! Character embedding table.

use oorandom::Rand32;

use crate::error::{Result, SegError};
use crate::window::PADDING_ID;

/// Dense `vocab_size x embed_size` table, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingTable {
    vocab_size: usize,
    embed_size: usize,
    data: Vec<f32>,
}

impl EmbeddingTable {
    /// Random table with entries uniform in `[-1, 1)`.
    pub fn random(vocab_size: usize, embed_size: usize, rng: &mut Rand32) -> Self {
        let data = (0..vocab_size * embed_size)
            .map(|_| rng.rand_float() * 2.0 - 1.0)
            .collect();
        Self {
            vocab_size,
            embed_size,
            data,
        }
    }

    pub fn from_vec(vocab_size: usize, embed_size: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != vocab_size * embed_size {
            return Err(SegError::Config(format!(
                "embedding data has {} values, expected {vocab_size}x{embed_size}",
                data.len()
            )));
        }
        Ok(Self {
            vocab_size,
            embed_size,
            data,
        })
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    pub fn embed_size(&self) -> usize {
        self.embed_size
    }

    pub fn row(&self, id: usize) -> &[f32] {
        &self.data[id * self.embed_size..(id + 1) * self.embed_size]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Concatenate the embeddings of a window's IDs into one input vector.
    pub fn lookup_window(&self, window: &[usize]) -> Result<Vec<f32>> {
        let mut x = Vec::with_capacity(window.len() * self.embed_size);
        for &id in window {
            if id >= self.vocab_size {
                return Err(SegError::Config(format!(
                    "vocabulary id {id} out of range for vocab_size {}",
                    self.vocab_size
                )));
            }
            x.extend_from_slice(self.row(id));
        }
        Ok(x)
    }

    /// Add `scale * grad` back into the rows of a window, one slot per ID.
    ///
    /// The padding row stays fixed. Repeated IDs accumulate.
    pub fn scatter_add(&mut self, window: &[usize], grad: &[f32], scale: f32) {
        debug_assert_eq!(grad.len(), window.len() * self.embed_size);
        for (&id, slot) in window.iter().zip(grad.chunks_exact(self.embed_size)) {
            if id == PADDING_ID {
                continue;
            }
            let row = &mut self.data[id * self.embed_size..(id + 1) * self.embed_size];
            for (value, g) in row.iter_mut().zip(slot) {
                *value += scale * g;
            }
        }
    }
}
