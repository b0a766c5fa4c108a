//! zhseg training CLI
//!
//! `prepare` encodes a whitespace-segmented corpus into the windowed cache
//! and its vocabulary; `fit` trains on that cache and writes the checkpoint.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use zhseg_core::ModelConfig;
use zhseg_core::config::DEFAULT_HIDDEN_SIZE;
use zhseg_trainer::{DEFAULT_ALPHA, TrainConfig, prepare_cache, run_training};

#[derive(Parser)]
#[command(name = "train")]
#[command(about = "Train the zhseg Chinese word segmenter")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a segmented corpus into word/label cache files
    Prepare {
        /// Corpus with one sentence per line, words separated by spaces
        corpus: PathBuf,

        /// Vocabulary size including the padding and unknown ids
        #[arg(long, default_value_t = 3500)]
        vocab_size: usize,

        /// Characters on each side of the window center
        #[arg(long, default_value_t = 1)]
        skip_window: usize,

        #[arg(long, default_value = "word.txt")]
        word_file: PathBuf,

        #[arg(long, default_value = "label.txt")]
        label_file: PathBuf,

        #[arg(long, default_value = "vocab.json")]
        vocab: PathBuf,
    },
    /// Train on a prepared cache and write the checkpoint
    Fit {
        #[arg(long, default_value_t = 3500)]
        vocab_size: usize,

        #[arg(long, default_value_t = 50)]
        embed_size: usize,

        #[arg(long, default_value_t = 1)]
        skip_window: usize,

        #[arg(long, default_value_t = DEFAULT_HIDDEN_SIZE)]
        hidden_size: usize,

        /// Perceptron step size
        #[arg(long, default_value_t = DEFAULT_ALPHA)]
        alpha: f32,

        #[arg(long, default_value_t = 1)]
        epochs: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value = "word.txt")]
        word_file: PathBuf,

        #[arg(long, default_value = "label.txt")]
        label_file: PathBuf,

        #[arg(long, default_value = "model.safetensors")]
        checkpoint: PathBuf,

        /// Log progress every N sentences (0 disables)
        #[arg(long, default_value_t = 1000)]
        log_every: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Prepare {
            corpus,
            vocab_size,
            skip_window,
            word_file,
            label_file,
            vocab,
        } => {
            prepare_cache(
                &corpus,
                vocab_size,
                skip_window,
                &word_file,
                &label_file,
                &vocab,
            )
            .context("prepare failed")?;
        }
        Commands::Fit {
            vocab_size,
            embed_size,
            skip_window,
            hidden_size,
            alpha,
            epochs,
            seed,
            word_file,
            label_file,
            checkpoint,
            log_every,
        } => {
            let model = ModelConfig::new(vocab_size, embed_size, skip_window)
                .with_hidden_size(hidden_size);
            let config = TrainConfig::new(model)
                .with_alpha(alpha)
                .with_epochs(epochs)
                .with_seed(seed)
                .with_cache_files(word_file, label_file)
                .with_checkpoint(checkpoint)
                .with_log_every(log_every);

            run_training(&config).context("training failed")?;
            info!(config = %config.model_config_path().display(), "model config written");
        }
    }

    Ok(())
}
