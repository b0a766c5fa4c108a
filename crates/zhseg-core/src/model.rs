//! # Model Parameters
//!
//! The complete mutable parameter graph of a segmentation model (embedding
//! table, scoring network, transition model) and its safetensors checkpoint.

use std::collections::HashMap;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use oorandom::Rand32;
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::embedding::EmbeddingTable;
use crate::error::{Result, SegError};
use crate::network::{Activation, ScoringNetwork};
use crate::tags::Tag;
use crate::transition::{TRANSITION_ROWS, TransitionModel};
use crate::viterbi::ViterbiDecoder;
use crate::window::WindowMatrix;

pub const EMBEDDINGS: &str = "embeddings";
pub const W2: &str = "w2";
pub const B2: &str = "b2";
pub const W3: &str = "w3";
pub const B3: &str = "b3";
pub const TRANSITIONS: &str = "transitions";

/// Every learned parameter of a model, owned as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub config: ModelConfig,
    pub embeddings: EmbeddingTable,
    pub network: ScoringNetwork,
    pub transitions: TransitionModel,
}

impl ModelParams {
    /// Freshly initialized parameters, reproducible for a given seed.
    pub fn init(config: ModelConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        let mut rng = Rand32::new(seed);

        let embeddings = EmbeddingTable::random(config.vocab_size, config.embed_size, &mut rng);
        let network = ScoringNetwork::new(config.input_dim(), config.hidden_size, &mut rng);

        debug!(
            vocab_size = config.vocab_size,
            embed_size = config.embed_size,
            hidden_size = config.hidden_size,
            seed,
            "initialized model parameters"
        );

        Ok(Self {
            config,
            embeddings,
            network,
            transitions: TransitionModel::new(),
        })
    }

    /// Run every window through the scoring network.
    pub fn score_windows(&self, windows: &WindowMatrix) -> Result<Vec<Activation>> {
        if windows.window_len() != self.config.window_len() {
            return Err(SegError::Config(format!(
                "windows have length {}, model expects {}",
                windows.window_len(),
                self.config.window_len()
            )));
        }
        windows
            .rows()
            .map(|window| {
                let x = self.embeddings.lookup_window(window)?;
                self.network.forward(x)
            })
            .collect()
    }

    /// Best legal tag path for a sentence given as windows.
    pub fn decode(&self, windows: &WindowMatrix) -> Result<Vec<Tag>> {
        let activations = self.score_windows(windows)?;
        ViterbiDecoder::new().decode(&emission_matrix(&activations), &self.transitions)
    }

    /// Best legal tag path for a sentence of vocabulary IDs.
    pub fn tag_ids(&self, sentence: &[usize]) -> Result<Vec<Tag>> {
        self.decode(&WindowMatrix::build(sentence, self.config.skip_window))
    }

    /// Write every parameter to a safetensors file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config = &self.config;
        let device = Device::Cpu;

        let mut tensors = HashMap::new();
        tensors.insert(
            EMBEDDINGS,
            Tensor::from_vec(
                self.embeddings.as_slice().to_vec(),
                (config.vocab_size, config.embed_size),
                &device,
            )?,
        );
        tensors.insert(
            W2,
            Tensor::from_vec(
                self.network.w2().to_vec(),
                (config.hidden_size, config.input_dim()),
                &device,
            )?,
        );
        tensors.insert(
            B2,
            Tensor::from_vec(self.network.b2().to_vec(), config.hidden_size, &device)?,
        );
        tensors.insert(
            W3,
            Tensor::from_vec(
                self.network.w3().to_vec(),
                (Tag::NUM_TAGS, config.hidden_size),
                &device,
            )?,
        );
        tensors.insert(
            B3,
            Tensor::from_vec(self.network.b3().to_vec(), Tag::NUM_TAGS, &device)?,
        );
        tensors.insert(
            TRANSITIONS,
            Tensor::from_vec(
                self.transitions.as_matrix(),
                (TRANSITION_ROWS, Tag::NUM_TAGS),
                &device,
            )?,
        );

        candle_core::safetensors::save(&tensors, path)?;
        info!(path = %path.display(), "saved checkpoint");
        Ok(())
    }

    /// Restore parameters saved by [`save`](Self::save).
    ///
    /// Every tensor's shape is checked against `config`; any disagreement
    /// is a [`SegError::Config`], a missing file is
    /// [`SegError::CheckpointNotFound`].
    pub fn load<P: AsRef<Path>>(path: P, config: ModelConfig) -> Result<Self> {
        let path = path.as_ref();
        config.validate()?;
        if !path.exists() {
            return Err(SegError::CheckpointNotFound(path.to_path_buf()));
        }

        let tensors = candle_core::safetensors::load(path, &Device::Cpu)?;
        let input_dim = config.input_dim();
        let hidden = config.hidden_size;

        let embedding_shape = [config.vocab_size, config.embed_size];
        let embeddings = EmbeddingTable::from_vec(
            config.vocab_size,
            config.embed_size,
            read_tensor(&tensors, EMBEDDINGS, &embedding_shape)?,
        )?;
        let network = ScoringNetwork::from_parts(
            input_dim,
            hidden,
            read_tensor(&tensors, W2, &[hidden, input_dim])?,
            read_tensor(&tensors, B2, &[hidden])?,
            read_tensor(&tensors, W3, &[Tag::NUM_TAGS, hidden])?,
            read_tensor(&tensors, B3, &[Tag::NUM_TAGS])?,
        )?;
        let transitions = TransitionModel::from_matrix(&read_tensor(
            &tensors,
            TRANSITIONS,
            &[TRANSITION_ROWS, Tag::NUM_TAGS],
        )?)?;

        info!(path = %path.display(), "loaded checkpoint");
        Ok(Self {
            config,
            embeddings,
            network,
            transitions,
        })
    }
}

/// Stack the emission scores of a sentence's activations.
pub fn emission_matrix(activations: &[Activation]) -> Vec<[f32; Tag::NUM_TAGS]> {
    activations.iter().map(|act| act.scores).collect()
}

fn read_tensor(tensors: &HashMap<String, Tensor>, name: &str, shape: &[usize]) -> Result<Vec<f32>> {
    let tensor = tensors
        .get(name)
        .ok_or_else(|| SegError::Config(format!("checkpoint is missing tensor {name:?}")))?;
    if tensor.dims() != shape {
        return Err(SegError::Config(format!(
            "tensor {name:?} has shape {:?}, configuration expects {shape:?}",
            tensor.dims()
        )));
    }
    Ok(tensor
        .to_dtype(DType::F32)?
        .flatten_all()?
        .to_vec1::<f32>()?)
}
