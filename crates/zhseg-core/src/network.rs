//! # Scoring Network
//!
//! Two-layer network mapping a concatenated window embedding to one raw
//! emission score per tag:
//!
//! ```text
//! hidden = sigmoid(W2 · x + b2)
//! scores = W3 · hidden + b3
//! ```
//!
//! Gradients are computed in closed form. For a single tag score `s_t`:
//!
//! ```text
//! ds_t/dW3[t,k] = hidden[k]            ds_t/db3[t] = 1
//! delta[k]      = W3[t,k] · hidden[k] · (1 - hidden[k])
//! ds_t/dW2[k,j] = delta[k] · x[j]      ds_t/db2[k] = delta[k]
//! ds_t/dx[j]    = Σ_k W2[k,j] · delta[k]
//! ```

use oorandom::Rand32;

use crate::error::{Result, SegError};
use crate::tags::Tag;

const NUM_TAGS: usize = Tag::NUM_TAGS;

/// Forward-pass record for one window, kept for the update step.
#[derive(Debug, Clone)]
pub struct Activation {
    pub input: Vec<f32>,
    pub hidden: Vec<f32>,
    pub scores: [f32; NUM_TAGS],
}

/// Gradient of one tag's score with respect to every parameter and the input.
#[derive(Debug, Clone)]
pub struct TagGradient {
    pub w2: Vec<f32>,
    pub b2: Vec<f32>,
    pub w3: Vec<f32>,
    pub b3: Vec<f32>,
    pub input: Vec<f32>,
}

/// Hidden and output layer parameters, all row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringNetwork {
    input_dim: usize,
    hidden_dim: usize,
    w2: Vec<f32>,
    b2: Vec<f32>,
    w3: Vec<f32>,
    b3: Vec<f32>,
}

fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

/// Standard normal sample, resampled until it falls within two standard deviations.
fn truncated_normal(rng: &mut Rand32) -> f32 {
    loop {
        // Box-Muller; 1 - u keeps the log argument in (0, 1]
        let u1 = 1.0 - rng.rand_float();
        let u2 = rng.rand_float();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
        if z.abs() <= 2.0 {
            return z;
        }
    }
}

impl ScoringNetwork {
    /// Randomly initialized network.
    ///
    /// Weights are drawn from a truncated normal with standard deviation
    /// `1/sqrt(input_dim)`; biases start at zero.
    pub fn new(input_dim: usize, hidden_dim: usize, rng: &mut Rand32) -> Self {
        let stddev = 1.0 / (input_dim as f32).sqrt();
        let w2 = (0..hidden_dim * input_dim)
            .map(|_| truncated_normal(rng) * stddev)
            .collect();
        let w3 = (0..NUM_TAGS * hidden_dim)
            .map(|_| truncated_normal(rng) * stddev)
            .collect();

        Self {
            input_dim,
            hidden_dim,
            w2,
            b2: vec![0.0; hidden_dim],
            w3,
            b3: vec![0.0; NUM_TAGS],
        }
    }

    /// Assemble a network from raw parameters, checking every shape.
    pub fn from_parts(
        input_dim: usize,
        hidden_dim: usize,
        w2: Vec<f32>,
        b2: Vec<f32>,
        w3: Vec<f32>,
        b3: Vec<f32>,
    ) -> Result<Self> {
        let expect = |name: &str, got: usize, want: usize| {
            if got == want {
                Ok(())
            } else {
                Err(SegError::Config(format!(
                    "{name} has {got} values, expected {want}"
                )))
            }
        };
        expect("w2", w2.len(), hidden_dim * input_dim)?;
        expect("b2", b2.len(), hidden_dim)?;
        expect("w3", w3.len(), NUM_TAGS * hidden_dim)?;
        expect("b3", b3.len(), NUM_TAGS)?;

        Ok(Self {
            input_dim,
            hidden_dim,
            w2,
            b2,
            w3,
            b3,
        })
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    pub fn w2(&self) -> &[f32] {
        &self.w2
    }

    pub fn b2(&self) -> &[f32] {
        &self.b2
    }

    pub fn w3(&self) -> &[f32] {
        &self.w3
    }

    pub fn b3(&self) -> &[f32] {
        &self.b3
    }

    /// Score one window input.
    pub fn forward(&self, input: Vec<f32>) -> Result<Activation> {
        if input.len() != self.input_dim {
            return Err(SegError::Config(format!(
                "network input has {} values, expected {}",
                input.len(),
                self.input_dim
            )));
        }

        let hidden: Vec<f32> = self
            .w2
            .chunks_exact(self.input_dim)
            .zip(&self.b2)
            .map(|(row, b)| sigmoid(dot(row, &input) + b))
            .collect();

        let mut scores = [0.0f32; NUM_TAGS];
        for (t, row) in self.w3.chunks_exact(self.hidden_dim).enumerate() {
            scores[t] = dot(row, &hidden) + self.b3[t];
        }

        Ok(Activation {
            input,
            hidden,
            scores,
        })
    }

    /// Backpropagated hidden-layer signal for a weighting of the output scores.
    fn hidden_delta(&self, act: &Activation, weights: &[f32; NUM_TAGS]) -> Vec<f32> {
        (0..self.hidden_dim)
            .map(|k| {
                let upstream: f32 = (0..NUM_TAGS)
                    .map(|t| weights[t] * self.w3[t * self.hidden_dim + k])
                    .sum();
                let h = act.hidden[k];
                upstream * h * (1.0 - h)
            })
            .collect()
    }

    fn input_gradient(&self, delta: &[f32]) -> Vec<f32> {
        let mut grad = vec![0.0f32; self.input_dim];
        for (row, d) in self.w2.chunks_exact(self.input_dim).zip(delta) {
            for (g, w) in grad.iter_mut().zip(row) {
                *g += w * d;
            }
        }
        grad
    }

    /// Gradient of `scores[tag]` at the given activation.
    pub fn score_gradient(&self, act: &Activation, tag: Tag) -> TagGradient {
        let t = tag.index();
        let mut weights = [0.0f32; NUM_TAGS];
        weights[t] = 1.0;

        let delta = self.hidden_delta(act, &weights);

        let mut w3 = vec![0.0f32; NUM_TAGS * self.hidden_dim];
        w3[t * self.hidden_dim..(t + 1) * self.hidden_dim].copy_from_slice(&act.hidden);
        let mut b3 = vec![0.0f32; NUM_TAGS];
        b3[t] = 1.0;

        let w2 = delta
            .iter()
            .flat_map(|d| act.input.iter().map(move |x| d * x))
            .collect();
        let input = self.input_gradient(&delta);

        TagGradient {
            w2,
            b2: delta,
            w3,
            b3,
            input,
        }
    }

    /// Push `scores[gold]` up and `scores[predicted]` down by one step of `alpha`.
    ///
    /// Every gradient is taken at the pre-update parameters. Returns the
    /// gradient of `scores[gold] - scores[predicted]` with respect to the
    /// input, unscaled, for the caller to fold back into the embeddings.
    pub fn apply_margin_update(
        &mut self,
        act: &Activation,
        gold: Tag,
        predicted: Tag,
        alpha: f32,
    ) -> Vec<f32> {
        let mut direction = [0.0f32; NUM_TAGS];
        direction[gold.index()] += 1.0;
        direction[predicted.index()] -= 1.0;

        let delta = self.hidden_delta(act, &direction);
        let input_grad = self.input_gradient(&delta);

        for (t, row) in self.w3.chunks_exact_mut(self.hidden_dim).enumerate() {
            if direction[t] == 0.0 {
                continue;
            }
            for (w, h) in row.iter_mut().zip(&act.hidden) {
                *w += alpha * direction[t] * h;
            }
            self.b3[t] += alpha * direction[t];
        }

        for ((row, b), d) in self
            .w2
            .chunks_exact_mut(self.input_dim)
            .zip(self.b2.iter_mut())
            .zip(&delta)
        {
            *b += alpha * d;
            for (w, x) in row.iter_mut().zip(&act.input) {
                *w += alpha * d * x;
            }
        }

        input_grad
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_network() -> ScoringNetwork {
        let mut rng = Rand32::new(42);
        ScoringNetwork::new(6, 5, &mut rng)
    }

    fn input() -> Vec<f32> {
        vec![0.3, -0.2, 0.9, -0.7, 0.1, 0.5]
    }

    #[test]
    fn test_initialization() {
        let net = small_network();
        let bound = 2.0 / 6f32.sqrt() + 1e-6;
        assert!(net.w2().iter().all(|w| w.abs() <= bound));
        assert!(net.w3().iter().all(|w| w.abs() <= bound));
        assert!(net.b2().iter().all(|&b| b == 0.0));
        assert!(net.b3().iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_forward_is_pure() {
        let net = small_network();
        let a = net.forward(input()).unwrap();
        let b = net.forward(input()).unwrap();
        assert_eq!(a.scores, b.scores);
        assert!(a.hidden.iter().all(|h| (0.0..=1.0).contains(h)));
        assert!(net.forward(vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_input_gradient_matches_finite_difference() {
        let net = small_network();
        let act = net.forward(input()).unwrap();
        let eps = 1e-2f32;

        for tag in Tag::all_tags() {
            let grad = net.score_gradient(&act, *tag);
            for j in 0..net.input_dim() {
                let mut plus = input();
                plus[j] += eps;
                let mut minus = input();
                minus[j] -= eps;
                let numeric = (net.forward(plus).unwrap().scores[tag.index()]
                    - net.forward(minus).unwrap().scores[tag.index()])
                    / (2.0 * eps);
                assert!(
                    (numeric - grad.input[j]).abs() < 1e-2,
                    "tag {tag} input {j}: numeric {numeric} vs analytic {}",
                    grad.input[j]
                );
            }
        }
    }

    #[test]
    fn test_bias_gradient_matches_finite_difference() {
        let net = small_network();
        let act = net.forward(input()).unwrap();
        let grad = net.score_gradient(&act, Tag::Middle);
        let eps = 1e-2f32;

        for k in 0..net.hidden_dim() {
            let mut b2_plus = net.b2().to_vec();
            b2_plus[k] += eps;
            let mut b2_minus = net.b2().to_vec();
            b2_minus[k] -= eps;
            let score = |b2: Vec<f32>| {
                ScoringNetwork::from_parts(
                    6,
                    5,
                    net.w2().to_vec(),
                    b2,
                    net.w3().to_vec(),
                    net.b3().to_vec(),
                )
                .unwrap()
                .forward(input())
                .unwrap()
                .scores[Tag::Middle.index()]
            };
            let numeric = (score(b2_plus) - score(b2_minus)) / (2.0 * eps);
            assert!((numeric - grad.b2[k]).abs() < 1e-2);
        }
        assert_eq!(grad.b3, vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_margin_update_raises_gold_over_predicted() {
        let mut net = small_network();
        let act = net.forward(input()).unwrap();
        let before = act.scores[Tag::Begin.index()] - act.scores[Tag::Single.index()];

        net.apply_margin_update(&act, Tag::Begin, Tag::Single, 0.01);

        let after_act = net.forward(input()).unwrap();
        let after = after_act.scores[Tag::Begin.index()] - after_act.scores[Tag::Single.index()];
        assert!(after > before);
    }

    #[test]
    fn test_margin_update_with_equal_tags_is_noop() {
        let mut net = small_network();
        let snapshot = net.clone();
        let act = net.forward(input()).unwrap();
        let grad = net.apply_margin_update(&act, Tag::End, Tag::End, 0.5);
        assert_eq!(net, snapshot);
        assert!(grad.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_from_parts_rejects_bad_shapes() {
        let result = ScoringNetwork::from_parts(
            6,
            5,
            vec![0.0; 30],
            vec![0.0; 5],
            vec![0.0; 19],
            vec![0.0; 4],
        );
        assert!(result.is_err());
    }
}
