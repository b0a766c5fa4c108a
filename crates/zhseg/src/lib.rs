//! # zhseg
//!
//! Chinese word segmentation by 4-tag sequence labeling (Single, Begin,
//! Middle, End). Inference lives in [`zhseg_core`]; training from a
//! segmented corpus lives in [`zhseg_trainer`].
//!
//! ```rust
//! use zhseg::{ModelConfig, ModelParams, Segmenter, Vocabulary};
//!
//! let vocab = Vocabulary::build(["北京 欢迎 你"], 10);
//! let params = ModelParams::init(ModelConfig::new(10, 4, 1).with_hidden_size(8), 7).unwrap();
//! let segmenter = Segmenter::new(params, vocab).unwrap();
//!
//! let words = segmenter.segment("北京欢迎你").unwrap();
//! assert_eq!(words.concat(), "北京欢迎你");
//! ```

pub use zhseg_core::*;

pub mod trainer {
    pub use zhseg_trainer::*;
}
