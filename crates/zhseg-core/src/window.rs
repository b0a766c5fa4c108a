//! # Context Windows
//!
//! Turns an ID-encoded sentence into one fixed-width window per character,
//! zero-padded at the sentence boundaries.

use crate::error::{Result, SegError};

/// Reserved vocabulary ID for positions outside the sentence.
pub const PADDING_ID: usize = 0;

/// Window length for a skip-window radius.
pub fn window_len(skip_window: usize) -> usize {
    2 * skip_window + 1
}

/// Row-major matrix of context windows, one row per sentence position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowMatrix {
    window_len: usize,
    ids: Vec<usize>,
}

impl WindowMatrix {
    /// Build the windows of `sentence` with radius `skip_window`.
    ///
    /// # Examples
    /// ```
    /// use zhseg_core::window::WindowMatrix;
    ///
    /// let windows = WindowMatrix::build(&[5, 6, 7], 1);
    /// assert_eq!(windows.row(0), &[0, 5, 6]);
    /// assert_eq!(windows.row(2), &[6, 7, 0]);
    /// ```
    pub fn build(sentence: &[usize], skip_window: usize) -> Self {
        let window_len = window_len(skip_window);
        let mut ids = Vec::with_capacity(sentence.len() * window_len);

        for center in 0..sentence.len() {
            for offset in 0..window_len {
                // center + offset - skip_window, without going below zero
                let id = (center + offset)
                    .checked_sub(skip_window)
                    .and_then(|pos| sentence.get(pos))
                    .copied()
                    .unwrap_or(PADDING_ID);
                ids.push(id);
            }
        }

        Self { window_len, ids }
    }

    /// Rebuild a matrix from its flattened row-major form.
    pub fn from_flat(ids: Vec<usize>, window_len: usize) -> Result<Self> {
        if window_len == 0 || window_len % 2 == 0 {
            return Err(SegError::Config(format!(
                "window length must be odd and positive, got {window_len}"
            )));
        }
        if ids.len() % window_len != 0 {
            return Err(SegError::Config(format!(
                "{} ids do not form rows of length {window_len}",
                ids.len()
            )));
        }
        Ok(Self { window_len, ids })
    }

    /// Number of windows (sentence positions).
    pub fn len(&self) -> usize {
        self.ids.len() / self.window_len
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// The window centered at position `i`.
    pub fn row(&self, i: usize) -> &[usize] {
        &self.ids[i * self.window_len..(i + 1) * self.window_len]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[usize]> {
        self.ids.chunks_exact(self.window_len)
    }

    /// The center ID of every window, i.e. the original sentence.
    pub fn centers(&self) -> Vec<usize> {
        let mid = self.window_len / 2;
        self.rows().map(|row| row[mid]).collect()
    }

    pub fn as_flat(&self) -> &[usize] {
        &self.ids
    }
}
