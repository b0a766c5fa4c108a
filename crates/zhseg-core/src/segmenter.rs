//! # Segmenter
//!
//! Inference entry point: restores a checkpoint with an explicit model
//! configuration and vocabulary, then tags and splits raw text.

use std::path::Path;

use tracing::debug;

use crate::config::ModelConfig;
use crate::error::{Result, SegError};
use crate::model::ModelParams;
use crate::tags::{Tag, word_spans};
use crate::vocab::Vocabulary;

/// Word segmenter backed by trained parameters.
pub struct Segmenter {
    params: ModelParams,
    vocab: Vocabulary,
}

impl Segmenter {
    /// Pair parameters with the vocabulary they were trained on.
    pub fn new(params: ModelParams, vocab: Vocabulary) -> Result<Self> {
        if vocab.id_count() > params.config.vocab_size {
            return Err(SegError::Config(format!(
                "vocabulary has {} ids but the model only embeds {}",
                vocab.id_count(),
                params.config.vocab_size
            )));
        }
        Ok(Self { params, vocab })
    }

    /// Load a checkpoint and its vocabulary file.
    ///
    /// Fails with [`SegError::CheckpointNotFound`] rather than falling back
    /// to random parameters.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        checkpoint: P,
        config: ModelConfig,
        vocab_path: Q,
    ) -> Result<Self> {
        let params = ModelParams::load(checkpoint, config)?;
        let vocab = Vocabulary::read_json(vocab_path)?;
        Self::new(params, vocab)
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Best tag path for a sentence of vocabulary IDs.
    pub fn tag_ids(&self, ids: &[usize]) -> Result<Vec<Tag>> {
        self.params.tag_ids(ids)
    }

    /// One tag per non-whitespace character of `text`.
    pub fn tag(&self, text: &str) -> Result<Vec<Tag>> {
        let mut tags = Vec::new();
        for chunk in text.split_whitespace() {
            tags.extend(self.tag_ids(&self.vocab.encode(chunk))?);
        }
        Ok(tags)
    }

    /// Split `text` into words.
    ///
    /// Whitespace always separates words; each whitespace-free chunk is
    /// segmented by the model. Concatenating the words reproduces the text
    /// without its whitespace.
    ///
    /// # Examples
    /// ```no_run
    /// use zhseg_core::{ModelConfig, Segmenter};
    ///
    /// let config = ModelConfig::new(3500, 50, 1);
    /// let segmenter = Segmenter::load("model.safetensors", config, "vocab.json").unwrap();
    /// let words = segmenter.segment("我爱北京天安门").unwrap();
    /// assert_eq!(words.concat(), "我爱北京天安门");
    /// ```
    pub fn segment<'a>(&self, text: &'a str) -> Result<Vec<&'a str>> {
        let mut words = Vec::new();
        for chunk in text.split_whitespace() {
            let offsets: Vec<usize> = chunk
                .char_indices()
                .map(|(i, _)| i)
                .chain(std::iter::once(chunk.len()))
                .collect();
            let tags = self.tag_ids(&self.vocab.encode(chunk))?;
            debug!(chunk, tags = %tags.iter().map(Tag::to_string).collect::<String>(), "segmented");

            for (start, end) in word_spans(&tags) {
                words.push(&chunk[offsets[start]..offsets[end]]);
            }
        }
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::TransitionModel;

    fn segmenter() -> Segmenter {
        let vocab = Vocabulary::build(["我 爱 北京 天安门"], 20);
        let config = ModelConfig::new(20, 4, 1).with_hidden_size(6);
        let params = ModelParams::init(config, 21).unwrap();
        Segmenter::new(params, vocab).unwrap()
    }

    #[test]
    fn test_segment_preserves_text() {
        let seg = segmenter();
        let text = "我爱北京天安门 你好";
        let words = seg.segment(text).unwrap();
        assert_eq!(words.concat(), "我爱北京天安门你好");
        assert!(words.iter().all(|w| !w.is_empty()));
        assert_eq!(seg.tag(text).unwrap().len(), 9);
    }

    #[test]
    fn test_segment_empty_text() {
        let seg = segmenter();
        assert!(seg.segment("").unwrap().is_empty());
        assert!(seg.segment("   ").unwrap().is_empty());
    }

    #[test]
    fn test_segment_follows_transitions() {
        let mut seg = segmenter();
        // Make single-character words overwhelmingly likely.
        let mut transitions = TransitionModel::new();
        transitions.reward_initial(Tag::Single, 1000.0).unwrap();
        transitions
            .reward(Tag::Single, Tag::Single, 1000.0)
            .unwrap();
        seg.params.transitions = transitions;

        let words = seg.segment("北京").unwrap();
        assert_eq!(words, vec!["北", "京"]);
    }

    #[test]
    fn test_vocabulary_larger_than_model() {
        let vocab = Vocabulary::build(["abcdefgh"], 20);
        let params = ModelParams::init(ModelConfig::new(5, 2, 1).with_hidden_size(2), 0).unwrap();
        assert!(matches!(
            Segmenter::new(params, vocab),
            Err(SegError::Config(_))
        ));
    }

    #[test]
    fn test_load_without_checkpoint_fails() {
        let missing = std::env::temp_dir().join("zhseg-no-such-checkpoint.safetensors");
        let result = Segmenter::load(&missing, ModelConfig::new(20, 4, 1), "vocab.json");
        assert!(matches!(result, Err(SegError::CheckpointNotFound(_))));
    }
}
