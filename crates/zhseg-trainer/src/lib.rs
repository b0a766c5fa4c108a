//! # zhseg Trainer
//!
//! Offline training for the zhseg segmenter: encoding a whitespace-segmented
//! corpus into the windowed cache, and the structured-perceptron loop that
//! fits every model parameter from that cache.

pub mod cache;
pub mod config;
pub mod corpus;
pub mod trainer;

use std::path::Path;

use anyhow::Context;
use tracing::info;
use zhseg_core::ModelParams;

pub use cache::WindowedCorpus;
pub use config::{DEFAULT_ALPHA, TrainConfig};
pub use corpus::{Corpus, EncodedSentence, parse_segmented_line};
pub use trainer::{EpochSummary, SentenceOutcome, Trainer};

/// Encode `corpus_path` and write the windowed cache plus its vocabulary.
pub fn prepare_cache(
    corpus_path: &Path,
    vocab_size: usize,
    skip_window: usize,
    word_file: &Path,
    label_file: &Path,
    vocab_path: &Path,
) -> anyhow::Result<()> {
    let corpus = Corpus::from_path(corpus_path, vocab_size)
        .with_context(|| format!("failed to read corpus {}", corpus_path.display()))?;

    let windowed = corpus.windowed(skip_window)?;
    windowed
        .write_files(word_file, label_file)
        .context("failed to write windowed cache")?;
    corpus
        .vocab
        .write_json(vocab_path)
        .with_context(|| format!("failed to write vocabulary {}", vocab_path.display()))?;

    info!(
        sentences = windowed.len(),
        vocab = corpus.vocab.len(),
        "cache ready"
    );
    Ok(())
}

/// Train from the cache named in `config` and write the checkpoint.
///
/// The model configuration is written next to the checkpoint so the
/// segmenter can be restored without repeating it.
pub fn run_training(config: &TrainConfig) -> anyhow::Result<ModelParams> {
    config
        .validate()
        .context("invalid training configuration")?;

    let corpus = WindowedCorpus::read_files(
        &config.word_file,
        &config.label_file,
        config.model.window_len(),
    )
    .with_context(|| {
        format!(
            "failed to read cache {} / {}",
            config.word_file.display(),
            config.label_file.display()
        )
    })?;
    if corpus.is_empty() {
        anyhow::bail!("training cache {} is empty", config.word_file.display());
    }
    corpus
        .check_vocab(config.model.vocab_size, &config.word_file)
        .context("training cache does not fit the model vocabulary")?;

    let params = ModelParams::init(config.model, config.seed)?;
    let mut trainer = Trainer::new(params, config.alpha)?.with_log_every(config.log_every);

    info!(
        sentences = corpus.len(),
        epochs = config.epochs,
        alpha = config.alpha,
        "starting training"
    );
    trainer
        .train(&corpus, config.epochs)
        .context("training failed")?;
    let params = trainer.into_params();

    let checkpoint_dir = config.checkpoint.parent();
    if let Some(dir) = checkpoint_dir.filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    params
        .save(&config.checkpoint)
        .with_context(|| format!("failed to save checkpoint {}", config.checkpoint.display()))?;
    let config_path = config.model_config_path();
    config
        .model
        .write_json(&config_path)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    info!(checkpoint = %config.checkpoint.display(), "training complete");
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use zhseg_core::{ModelConfig, SegError, Segmenter};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("zhseg-trainer-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_prepare_train_and_segment() {
        let dir = scratch_dir("pipeline");
        let corpus_path = dir.join("corpus.txt");
        std::fs::write(
            &corpus_path,
            "我们 喜欢 北京\n今天 天气 很 好\n北京 欢迎 你们\n好\n",
        )
        .unwrap();

        let word_file = dir.join("word.txt");
        let label_file = dir.join("label.txt");
        let vocab_path = dir.join("vocab.json");
        prepare_cache(&corpus_path, 30, 1, &word_file, &label_file, &vocab_path).unwrap();

        let config = TrainConfig::new(ModelConfig::new(30, 8, 1).with_hidden_size(16))
            .with_epochs(3)
            .with_cache_files(&word_file, &label_file)
            .with_checkpoint(dir.join("model.safetensors"))
            .with_log_every(0);
        let trained = run_training(&config).unwrap();

        let restored_config = ModelConfig::read_json(config.model_config_path()).unwrap();
        assert_eq!(restored_config, config.model);

        let segmenter = Segmenter::load(&config.checkpoint, restored_config, &vocab_path).unwrap();
        assert_eq!(segmenter.params(), &trained);
        let words = segmenter.segment("北京欢迎你们").unwrap();
        assert_eq!(words.concat(), "北京欢迎你们");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_out_of_range_id_fails_before_training() {
        let dir = scratch_dir("vocab-range");
        let word_file = dir.join("word.txt");
        let label_file = dir.join("label.txt");
        std::fs::write(&word_file, "0 3 99 3 99 5 99 5 0\n").unwrap();
        std::fs::write(&label_file, "1 2 3\n").unwrap();

        let config = TrainConfig::new(ModelConfig::new(10, 4, 1).with_hidden_size(8))
            .with_cache_files(&word_file, &label_file)
            .with_checkpoint(dir.join("model.safetensors"));
        let err = run_training(&config).unwrap_err();

        match err.downcast_ref::<SegError>() {
            Some(SegError::CacheFormat { file, line, .. }) => {
                assert_eq!(file, &word_file);
                assert_eq!(*line, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!config.checkpoint.exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_illegal_gold_path_is_reported_as_training_failure() {
        let dir = scratch_dir("illegal-gold");
        let word_file = dir.join("word.txt");
        let label_file = dir.join("label.txt");
        std::fs::write(&word_file, "0 3 4 3 4 0\n").unwrap();
        std::fs::write(&label_file, "2 3\n").unwrap();

        let config = TrainConfig::new(ModelConfig::new(10, 4, 1).with_hidden_size(8))
            .with_cache_files(&word_file, &label_file)
            .with_checkpoint(dir.join("model.safetensors"));
        let err = run_training(&config).unwrap_err();

        assert_eq!(err.to_string(), "training failed");
        assert!(matches!(
            err.downcast_ref::<SegError>(),
            Some(SegError::InvalidPath(_))
        ));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_cache_is_reported() {
        let dir = scratch_dir("missing");
        let config = TrainConfig::new(ModelConfig::new(10, 4, 1))
            .with_cache_files(dir.join("nope-word.txt"), dir.join("nope-label.txt"));
        let err = run_training(&config).unwrap_err();
        assert!(err.to_string().contains("failed to read cache"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
