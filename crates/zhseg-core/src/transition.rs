//! # Tag Transition Model
//!
//! A 5x4 score matrix: row 0 holds the initial-tag scores and row `1 + p`
//! holds the scores of transitions out of tag `p`. Only entries allowed by
//! the adjacency table are ever read or written.

use crate::error::{Result, SegError};
use crate::tags::Tag;

const NUM_TAGS: usize = Tag::NUM_TAGS;

/// Number of rows of the matrix form: initial row plus one per previous tag.
pub const TRANSITION_ROWS: usize = NUM_TAGS + 1;

/// Learned transition scores between boundary tags.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionModel {
    matrix: [[f32; NUM_TAGS]; TRANSITION_ROWS],
}

impl TransitionModel {
    /// Every legal entry starts at 1.0, every illegal entry at 0.0.
    pub fn new() -> Self {
        let mut matrix = [[0.0f32; NUM_TAGS]; TRANSITION_ROWS];
        for tag in Tag::initial_tags() {
            matrix[0][tag.index()] = 1.0;
        }
        for prev in Tag::all_tags() {
            for next in prev.successors() {
                matrix[1 + prev.index()][next.index()] = 1.0;
            }
        }
        Self { matrix }
    }

    /// Rebuild from a row-major 5x4 matrix.
    pub fn from_matrix(values: &[f32]) -> Result<Self> {
        if values.len() != TRANSITION_ROWS * NUM_TAGS {
            return Err(SegError::Config(format!(
                "transition matrix has {} values, expected {TRANSITION_ROWS}x{NUM_TAGS}",
                values.len()
            )));
        }
        let mut matrix = [[0.0f32; NUM_TAGS]; TRANSITION_ROWS];
        for (row, chunk) in matrix.iter_mut().zip(values.chunks_exact(NUM_TAGS)) {
            row.copy_from_slice(chunk);
        }
        Ok(Self { matrix })
    }

    /// Row-major 5x4 view, initial row first.
    pub fn as_matrix(&self) -> Vec<f32> {
        self.matrix.iter().flatten().copied().collect()
    }

    /// Score of starting a sentence in `tag`, `None` if it may not start one.
    pub fn initial(&self, tag: Tag) -> Option<f32> {
        Tag::is_valid_initial(tag).then(|| self.matrix[0][tag.index()])
    }

    /// Score of `prev -> next`, `None` for transitions outside the adjacency table.
    pub fn score(&self, prev: Tag, next: Tag) -> Option<f32> {
        Tag::is_valid_transition(prev, next).then(|| self.matrix[1 + prev.index()][next.index()])
    }

    pub fn reward_initial(&mut self, tag: Tag, delta: f32) -> Result<()> {
        if !Tag::is_valid_initial(tag) {
            return Err(SegError::InvalidPath(format!(
                "{tag} is not a legal initial tag"
            )));
        }
        self.matrix[0][tag.index()] += delta;
        Ok(())
    }

    pub fn reward(&mut self, prev: Tag, next: Tag, delta: f32) -> Result<()> {
        if !Tag::is_valid_transition(prev, next) {
            return Err(SegError::InvalidPath(format!(
                "{prev} -> {next} is not a legal transition"
            )));
        }
        self.matrix[1 + prev.index()][next.index()] += delta;
        Ok(())
    }
}

impl Default for TransitionModel {
    fn default() -> Self {
        Self::new()
    }
}
