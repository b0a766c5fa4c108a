//! # zhseg Core
//!
//! Chinese word segmentation as 4-tag sequence labeling. A two-layer
//! network scores every character from a window of embeddings, a learned
//! transition model scores adjacent tags, and Viterbi decoding picks the
//! best legal tag path.
//!
//! ## Quick Start
//!
//! ```rust
//! use zhseg_core::{ModelConfig, ModelParams, Tag};
//!
//! let config = ModelConfig::new(10, 4, 1).with_hidden_size(16);
//! let params = ModelParams::init(config, 42).unwrap();
//!
//! let tags = params.tag_ids(&[3, 4, 5, 6, 7]).unwrap();
//! assert_eq!(tags.len(), 5);
//! assert!(matches!(tags[0], Tag::Single | Tag::Begin));
//! ```
pub mod config;
pub mod embedding;
pub mod error;
pub mod model;
pub mod network;
pub mod segmenter;
pub mod tags;
pub mod transition;
pub mod viterbi;
pub mod vocab;
pub mod window;

// Re-export primary API
pub use config::ModelConfig;
pub use embedding::EmbeddingTable;
pub use error::{Result, SegError};
pub use model::{ModelParams, emission_matrix};
pub use network::{Activation, ScoringNetwork};
pub use segmenter::Segmenter;
pub use tags::Tag;
pub use transition::TransitionModel;
pub use viterbi::{ViterbiDecoder, path_score};
pub use vocab::Vocabulary;
pub use window::WindowMatrix;
