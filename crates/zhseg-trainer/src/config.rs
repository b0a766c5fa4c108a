//! Training run configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use zhseg_core::ModelConfig;
use zhseg_core::error::{Result, SegError};

/// Default perceptron learning rate.
pub const DEFAULT_ALPHA: f32 = 0.02;

/// Everything a training run needs up front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Shape of the model being trained.
    pub model: ModelConfig,
    /// Step size of every margin update.
    pub alpha: f32,
    /// Number of passes over the corpus.
    pub epochs: usize,
    /// Seed for parameter initialization.
    pub seed: u64,
    /// Windowed word cache file.
    pub word_file: PathBuf,
    /// Gold label cache file.
    pub label_file: PathBuf,
    /// Where the trained parameters are written.
    pub checkpoint: PathBuf,
    /// Log progress every this many sentences (0 disables).
    pub log_every: usize,
}

impl TrainConfig {
    /// Create a configuration with default alpha, a single epoch and the
    /// conventional `word.txt` / `label.txt` cache names.
    pub fn new(model: ModelConfig) -> Self {
        Self {
            model,
            alpha: DEFAULT_ALPHA,
            epochs: 1,
            seed: 42,
            word_file: PathBuf::from("word.txt"),
            label_file: PathBuf::from("label.txt"),
            checkpoint: PathBuf::from("model.safetensors"),
            log_every: 1000,
        }
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the word and label cache files.
    pub fn with_cache_files(
        mut self,
        word_file: impl Into<PathBuf>,
        label_file: impl Into<PathBuf>,
    ) -> Self {
        self.word_file = word_file.into();
        self.label_file = label_file.into();
        self
    }

    pub fn with_checkpoint(mut self, checkpoint: impl Into<PathBuf>) -> Self {
        self.checkpoint = checkpoint.into();
        self
    }

    pub fn with_log_every(mut self, log_every: usize) -> Self {
        self.log_every = log_every;
        self
    }

    /// Model config file written next to the checkpoint.
    pub fn model_config_path(&self) -> PathBuf {
        self.checkpoint.with_extension("config.json")
    }

    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(SegError::Config(format!(
                "alpha must be a positive number, got {}",
                self.alpha
            )));
        }
        if self.epochs == 0 {
            return Err(SegError::Config("epochs must be at least 1".into()));
        }
        Ok(())
    }
}
