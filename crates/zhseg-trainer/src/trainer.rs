//! Structured-perceptron training loop.
//!
//! Each sentence is scored, decoded with the current transitions and
//! compared with its gold path. Every diverging position pushes the gold
//! tag's score up and the predicted tag's score down across the network,
//! the window's embeddings and the transitions into both tags. Sentences
//! are processed strictly in order; updates from one sentence are visible
//! when the next is scored.

use tracing::{debug, info};
use zhseg_core::error::{Result, SegError};
use zhseg_core::tags::validate_path;
use zhseg_core::{ModelParams, Tag, ViterbiDecoder, WindowMatrix, emission_matrix};

use crate::cache::WindowedCorpus;

/// Result of training on one sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceOutcome {
    /// Number of characters in the sentence.
    pub positions: usize,
    /// Positions where the decoded tag differed from gold (and were updated).
    pub errors: usize,
}

/// Totals over one pass of the corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpochSummary {
    pub sentences: usize,
    pub positions: usize,
    pub errors: usize,
    /// Sentences decoded without a single error.
    pub exact_sentences: usize,
}

impl EpochSummary {
    fn record(&mut self, outcome: SentenceOutcome) {
        self.sentences += 1;
        self.positions += outcome.positions;
        self.errors += outcome.errors;
        if outcome.errors == 0 {
            self.exact_sentences += 1;
        }
    }

    /// Fraction of positions decoded correctly.
    pub fn accuracy(&self) -> f32 {
        if self.positions == 0 {
            0.0
        } else {
            (self.positions - self.errors) as f32 / self.positions as f32
        }
    }
}

/// Owns the parameters for the duration of a run.
pub struct Trainer {
    params: ModelParams,
    alpha: f32,
    decoder: ViterbiDecoder,
    log_every: usize,
}

impl Trainer {
    pub fn new(params: ModelParams, alpha: f32) -> Result<Self> {
        if !(alpha.is_finite() && alpha > 0.0) {
            return Err(SegError::Config(format!(
                "alpha must be a positive number, got {alpha}"
            )));
        }
        Ok(Self {
            params,
            alpha,
            decoder: ViterbiDecoder::new(),
            log_every: 0,
        })
    }

    /// Log progress every `log_every` sentences (0 disables).
    pub fn with_log_every(mut self, log_every: usize) -> Self {
        self.log_every = log_every;
        self
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn into_params(self) -> ModelParams {
        self.params
    }

    fn check_gold(windows: &WindowMatrix, gold: &[Tag]) -> Result<()> {
        if gold.len() != windows.len() {
            return Err(SegError::InvalidPath(format!(
                "{} gold tags for {} windows",
                gold.len(),
                windows.len()
            )));
        }
        validate_path(gold)
    }

    /// Decode one sentence and update every parameter where it disagrees with `gold`.
    pub fn train_sentence(
        &mut self,
        windows: &WindowMatrix,
        gold: &[Tag],
    ) -> Result<SentenceOutcome> {
        Self::check_gold(windows, gold)?;

        let activations = self.params.score_windows(windows)?;
        let predicted = self
            .decoder
            .decode(&emission_matrix(&activations), &self.params.transitions)?;

        let alpha = self.alpha;
        let mut errors = 0;

        for (pos, (&gold_tag, &pred_tag)) in gold.iter().zip(&predicted).enumerate() {
            if gold_tag == pred_tag {
                continue;
            }
            errors += 1;

            let window = windows.row(pos);
            // Re-score with the parameters as already updated at earlier positions.
            let x = self.params.embeddings.lookup_window(window)?;
            let act = self.params.network.forward(x)?;
            let input_grad = self
                .params
                .network
                .apply_margin_update(&act, gold_tag, pred_tag, alpha);
            self
                .params
                .embeddings
                .scatter_add(window, &input_grad, alpha);

            let transitions = &mut self.params.transitions;
            if pos == 0 {
                transitions.reward_initial(gold_tag, alpha)?;
                transitions.reward_initial(pred_tag, -alpha)?;
            } else {
                transitions.reward(gold[pos - 1], gold_tag, alpha)?;
                transitions.reward(predicted[pos - 1], pred_tag, -alpha)?;
            }
        }

        debug!(positions = gold.len(), errors, "trained sentence");
        Ok(SentenceOutcome {
            positions: gold.len(),
            errors,
        })
    }

    /// One sequential pass over the corpus.
    pub fn train_epoch(&mut self, corpus: &WindowedCorpus) -> Result<EpochSummary> {
        let mut summary = EpochSummary::default();

        for (idx, (windows, gold)) in corpus.iter().enumerate() {
            let outcome = self.train_sentence(windows, gold)?;
            summary.record(outcome);

            if self.log_every > 0 && (idx + 1) % self.log_every == 0 {
                info!(
                    sentence = idx + 1,
                    total = corpus.len(),
                    accuracy = format!("{:.2}%", summary.accuracy() * 100.0),
                    "training progress"
                );
            }
        }

        Ok(summary)
    }

    /// Run `epochs` passes, returning the summary of each.
    pub fn train(&mut self, corpus: &WindowedCorpus, epochs: usize) -> Result<Vec<EpochSummary>> {
        let mut summaries = Vec::with_capacity(epochs);
        for epoch in 0..epochs {
            let summary = self.train_epoch(corpus)?;
            info!(
                epoch = epoch + 1,
                epochs,
                sentences = summary.sentences,
                errors = summary.errors,
                accuracy = format!("{:.2}%", summary.accuracy() * 100.0),
                "epoch complete"
            );
            summaries.push(summary);
        }
        Ok(summaries)
    }

    /// Decode every sentence without updating anything.
    pub fn evaluate(&self, corpus: &WindowedCorpus) -> Result<EpochSummary> {
        let mut summary = EpochSummary::default();
        for (windows, gold) in corpus.iter() {
            Self::check_gold(windows, gold)?;
            let predicted = self.params.decode(windows)?;
            let errors = gold.iter().zip(&predicted).filter(|(g, p)| g != p).count();
            summary.record(SentenceOutcome {
                positions: gold.len(),
                errors,
            });
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zhseg_core::tags::tags_from_indices;
    use zhseg_core::{ModelConfig, TransitionModel};

    const ALPHA: f32 = 0.02;

    fn params(seed: u64) -> ModelParams {
        ModelParams::init(ModelConfig::new(10, 4, 1).with_hidden_size(12), seed).unwrap()
    }

    fn sentence() -> (WindowMatrix, Vec<Tag>) {
        (
            WindowMatrix::build(&[3, 4, 5, 6, 7], 1),
            tags_from_indices(&[1, 2, 2, 3, 0]).unwrap(),
        )
    }

    fn corpus() -> WindowedCorpus {
        let (windows, gold) = sentence();
        let mut corpus = WindowedCorpus::new(3);
        corpus.push(windows, gold).unwrap();
        corpus
    }

    fn matrix_entry(model: &TransitionModel, prev: Option<Tag>, next: Tag) -> f32 {
        let row = prev.map_or(0, |p| 1 + p.index());
        model.as_matrix()[row * Tag::NUM_TAGS + next.index()]
    }

    #[test]
    fn test_only_sentence_embeddings_change() {
        let initial = params(1);
        let mut trainer = Trainer::new(initial.clone(), ALPHA).unwrap();
        let summary = trainer.train(&corpus(), 1).unwrap()[0];
        let trained = trainer.params();

        for id in [0, 1, 2, 8, 9] {
            assert_eq!(trained.embeddings.row(id), initial.embeddings.row(id), "row {id}");
        }
        if summary.errors > 0 {
            let changed = (3..=7)
                .filter(|&id| trained.embeddings.row(id) != initial.embeddings.row(id))
                .count();
            assert!(changed > 0);
        }
    }

    #[test]
    fn test_transition_updates_follow_divergence() {
        for seed in 0..8 {
            let initial = params(seed);
            let (windows, gold) = sentence();
            let predicted = initial.decode(&windows).unwrap();

            let mut expected = initial.transitions.clone();
            for pos in 0..gold.len() {
                if gold[pos] == predicted[pos] {
                    continue;
                }
                if pos == 0 {
                    expected.reward_initial(gold[0], ALPHA).unwrap();
                    expected.reward_initial(predicted[0], -ALPHA).unwrap();
                } else {
                    expected.reward(gold[pos - 1], gold[pos], ALPHA).unwrap();
                    expected.reward(predicted[pos - 1], predicted[pos], -ALPHA).unwrap();
                }
            }

            let mut trainer = Trainer::new(initial, ALPHA).unwrap();
            trainer.train_sentence(&windows, &gold).unwrap();

            for (got, want) in trainer
                .params()
                .transitions
                .as_matrix()
                .iter()
                .zip(expected.as_matrix())
            {
                assert!((got - want).abs() < 1e-6, "seed {seed}: {got} vs {want}");
            }
        }
    }

    #[test]
    fn test_forced_divergence_rewards_gold_transitions() {
        let mut initial = params(3);
        // Force an all-Single prediction so positions 0..=3 diverge from gold.
        let mut transitions = TransitionModel::new();
        transitions.reward_initial(Tag::Single, 100.0).unwrap();
        transitions.reward(Tag::Single, Tag::Single, 100.0).unwrap();
        initial.transitions = transitions.clone();

        let (windows, gold) = sentence();
        let mut trainer = Trainer::new(initial, ALPHA).unwrap();
        let outcome = trainer.train_sentence(&windows, &gold).unwrap();
        assert_eq!(outcome, SentenceOutcome { positions: 5, errors: 4 });

        let trained = &trainer.params().transitions;
        for (prev, next) in [
            (Tag::Begin, Tag::Middle),
            (Tag::Middle, Tag::Middle),
            (Tag::Middle, Tag::End),
        ] {
            let delta = matrix_entry(trained, Some(prev), next)
                - matrix_entry(&transitions, Some(prev), next);
            assert!((delta - ALPHA).abs() < 1e-6, "{prev} -> {next}: {delta}");
        }
        let initial_begin =
            matrix_entry(trained, None, Tag::Begin) - matrix_entry(&transitions, None, Tag::Begin);
        assert!((initial_begin - ALPHA).abs() < 1e-6);
        let single_single = matrix_entry(trained, Some(Tag::Single), Tag::Single)
            - matrix_entry(&transitions, Some(Tag::Single), Tag::Single);
        assert!((single_single + 3.0 * ALPHA).abs() < 1e-4);
    }

    #[test]
    fn test_update_raises_gold_score_at_window() {
        let mut initial = params(5);
        let mut transitions = TransitionModel::new();
        transitions.reward_initial(Tag::Begin, 100.0).unwrap();
        initial.transitions = transitions;

        let windows = WindowMatrix::build(&[4], 1);
        let gold = vec![Tag::Single];
        let gap = |p: &ModelParams| {
            let scores = p.score_windows(&windows).unwrap()[0].scores;
            scores[Tag::Single.index()] - scores[Tag::Begin.index()]
        };
        let before = gap(&initial);

        let mut trainer = Trainer::new(initial, 0.001).unwrap();
        let outcome = trainer.train_sentence(&windows, &gold).unwrap();
        assert_eq!(outcome.errors, 1);
        assert!(gap(trainer.params()) > before);
    }

    #[test]
    fn test_training_is_deterministic() {
        let run = || {
            let mut trainer = Trainer::new(params(7), ALPHA).unwrap();
            trainer.train(&corpus(), 3).unwrap();
            trainer.into_params()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_repeated_passes_fit_one_sentence() {
        let mut trainer = Trainer::new(params(11), 0.05).unwrap();
        trainer.train(&corpus(), 200).unwrap();
        let summary = trainer.evaluate(&corpus()).unwrap();
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.exact_sentences, 1);
    }

    #[test]
    fn test_rejects_bad_gold() {
        let mut trainer = Trainer::new(params(1), ALPHA).unwrap();
        let windows = WindowMatrix::build(&[3, 4, 5], 1);
        let illegal = tags_from_indices(&[0, 2, 3]).unwrap();
        let short = tags_from_indices(&[0, 0]).unwrap();
        assert!(matches!(
            trainer.train_sentence(&windows, &illegal),
            Err(SegError::InvalidPath(_))
        ));
        assert!(matches!(
            trainer.train_sentence(&windows, &short),
            Err(SegError::InvalidPath(_))
        ));
        assert!(Trainer::new(params(1), 0.0).is_err());
    }

    #[test]
    fn test_accuracy() {
        let summary = EpochSummary {
            sentences: 2,
            positions: 10,
            errors: 3,
            exact_sentences: 1,
        };
        assert!((summary.accuracy() - 0.7).abs() < 1e-6);
        assert_eq!(EpochSummary::default().accuracy(), 0.0);
    }
}
