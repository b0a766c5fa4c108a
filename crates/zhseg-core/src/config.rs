//! Model shape configuration shared by training and inference.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegError};
use crate::window::window_len;

/// Default hidden layer width.
pub const DEFAULT_HIDDEN_SIZE: usize = 300;

/// Shape of a segmentation model.
///
/// Inference must be given the same configuration the checkpoint was
/// trained with; [`crate::model::ModelParams::load`] rejects mismatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of vocabulary IDs, including the padding and unknown IDs.
    pub vocab_size: usize,
    /// Dimension of every character embedding.
    pub embed_size: usize,
    /// Context radius on each side of the center character.
    pub skip_window: usize,
    /// Width of the scoring network's hidden layer.
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,
}

fn default_hidden_size() -> usize {
    DEFAULT_HIDDEN_SIZE
}

impl ModelConfig {
    /// Create a configuration with the default hidden width.
    pub fn new(vocab_size: usize, embed_size: usize, skip_window: usize) -> Self {
        Self {
            vocab_size,
            embed_size,
            skip_window,
            hidden_size: DEFAULT_HIDDEN_SIZE,
        }
    }

    /// Set the hidden layer width.
    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    /// Number of IDs in every window.
    pub fn window_len(&self) -> usize {
        window_len(self.skip_window)
    }

    /// Dimension of a concatenated window embedding.
    pub fn input_dim(&self) -> usize {
        self.window_len() * self.embed_size
    }

    pub fn validate(&self) -> Result<()> {
        // 0 is padding, 1 is unknown
        if self.vocab_size < 3 {
            return Err(SegError::Config(format!(
                "vocab_size must be at least 3, got {}",
                self.vocab_size
            )));
        }
        if self.embed_size == 0 {
            return Err(SegError::Config("embed_size must be positive".into()));
        }
        if self.hidden_size == 0 {
            return Err(SegError::Config("hidden_size must be positive".into()));
        }
        Ok(())
    }

    /// Read a configuration written by [`write_json`](Self::write_json) and validate it.
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = serde_json::from_reader(BufReader::new(File::open(path)?))
            .map_err(|e| SegError::Config(format!("unreadable model config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
