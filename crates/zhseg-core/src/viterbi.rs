//! # Viterbi Decoding for Boundary Tags
//!
//! Finds the highest-scoring legal tag path given per-position emission
//! scores and the transition model:
//!
//! ```text
//! score(t) = init[t0] + e[0,t0] + Σ_i (A[t_{i-1} -> t_i] + e[i,t_i])
//! ```
//!
//! Transitions outside the adjacency table are skipped structurally, never
//! scored. Ties go to the lowest tag index.

use crate::error::{Result, SegError};
use crate::tags::Tag;
use crate::transition::TransitionModel;

const NUM_TAGS: usize = Tag::NUM_TAGS;

/// Viterbi decoder over the 4-tag segmentation scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViterbiDecoder;

/// Path score and backpointer for Viterbi decoding.
#[derive(Debug, Clone, Copy)]
struct PathState {
    score: f32,
    prev_tag: Option<usize>,
}

impl PathState {
    const UNREACHABLE: PathState = PathState {
        score: f32::NEG_INFINITY,
        prev_tag: None,
    };
}

fn tag_at(idx: usize) -> Tag {
    Tag::all_tags()[idx]
}

impl ViterbiDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode the optimal tag sequence with the full dynamic program.
    ///
    /// # Arguments
    /// * `emissions` - One row of tag scores per sentence position
    /// * `transitions` - Initial and pairwise transition scores
    ///
    /// # Errors
    /// [`SegError::EmptyEmissions`] if there are no positions.
    pub fn decode(
        &self,
        emissions: &[[f32; NUM_TAGS]],
        transitions: &TransitionModel,
    ) -> Result<Vec<Tag>> {
        let seq_len = emissions.len();
        if seq_len == 0 {
            return Err(SegError::EmptyEmissions);
        }

        let mut dp = vec![[PathState::UNREACHABLE; NUM_TAGS]; seq_len];

        for tag in Tag::initial_tags() {
            if let Some(init) = transitions.initial(tag) {
                dp[0][tag.index()].score = init + emissions[0][tag.index()];
            }
        }

        // Forward pass
        for pos in 1..seq_len {
            for curr in 0..NUM_TAGS {
                let mut best: Option<(usize, f32)> = None;

                for prev in 0..NUM_TAGS {
                    let Some(trans) = transitions.score(tag_at(prev), tag_at(curr)) else {
                        continue;
                    };
                    let prev_score = dp[pos - 1][prev].score;
                    if prev_score == f32::NEG_INFINITY {
                        continue;
                    }

                    let score = prev_score + trans + emissions[pos][curr];
                    if best.is_none_or(|(_, s)| score > s) {
                        best = Some((prev, score));
                    }
                }

                if let Some((prev, score)) = best {
                    dp[pos][curr] = PathState {
                        score,
                        prev_tag: Some(prev),
                    };
                }
            }
        }

        // Find best final tag
        let mut best_final: Option<(usize, f32)> = None;
        for (tag, state) in dp[seq_len - 1].iter().enumerate() {
            if state.score == f32::NEG_INFINITY {
                continue;
            }
            if best_final.is_none_or(|(_, s)| state.score > s) {
                best_final = Some((tag, state.score));
            }
        }
        let (mut curr, _) = best_final.ok_or_else(|| {
            SegError::InvalidPath("no finite-scoring path through the emissions".into())
        })?;

        // Backtrack
        let mut path = Vec::with_capacity(seq_len);
        path.push(tag_at(curr));
        for pos in (1..seq_len).rev() {
            curr = dp[pos][curr].prev_tag.ok_or_else(|| {
                SegError::InvalidPath(format!("broken backpointer at position {pos}"))
            })?;
            path.push(tag_at(curr));
        }

        path.reverse();
        Ok(path)
    }

    /// Decode by extending exactly two live paths.
    ///
    /// One path starts in `Single`, the other in `Begin`. At each position
    /// every path moves to the better of the two tags its last tag allows,
    /// and the better of the two final paths wins. Cheaper than
    /// [`decode`](Self::decode) but not exact: paths never merge, so the
    /// result can score below the true optimum. Always legal.
    pub fn decode_two_path(
        &self,
        emissions: &[[f32; NUM_TAGS]],
        transitions: &TransitionModel,
    ) -> Result<Vec<Tag>> {
        let seq_len = emissions.len();
        if seq_len == 0 {
            return Err(SegError::EmptyEmissions);
        }

        let mut paths: Vec<(Vec<Tag>, f32)> = Tag::initial_tags()
            .into_iter()
            .map(|tag| {
                let init = transitions.initial(tag).unwrap_or(f32::NEG_INFINITY);
                let mut path = Vec::with_capacity(seq_len);
                path.push(tag);
                (path, init + emissions[0][tag.index()])
            })
            .collect();

        for row in &emissions[1..] {
            for (path, score) in paths.iter_mut() {
                let last = path[path.len() - 1];
                let [first, second] = last.successors().map(|next| {
                    let trans = transitions.score(last, next).unwrap_or(f32::NEG_INFINITY);
                    (next, *score + trans + row[next.index()])
                });
                let (next, next_score) = if second.1 > first.1 { second } else { first };
                path.push(next);
                *score = next_score;
            }
        }

        let (best, _) = paths
            .into_iter()
            .reduce(|best, cand| if cand.1 > best.1 { cand } else { best })
            .ok_or(SegError::EmptyEmissions)?;
        Ok(best)
    }
}

/// Total score of a given path under the emissions and transitions.
pub fn path_score(
    emissions: &[[f32; NUM_TAGS]],
    transitions: &TransitionModel,
    path: &[Tag],
) -> Result<f32> {
    if path.len() != emissions.len() {
        return Err(SegError::InvalidPath(format!(
            "path has {} tags for {} positions",
            path.len(),
            emissions.len()
        )));
    }
    let Some(&first) = path.first() else {
        return Err(SegError::EmptyEmissions);
    };

    let mut score = transitions
        .initial(first)
        .ok_or_else(|| SegError::InvalidPath(format!("path cannot start with {first}")))?
        + emissions[0][first.index()];

    for (pos, pair) in path.windows(2).enumerate() {
        let trans = transitions.score(pair[0], pair[1]).ok_or_else(|| {
            SegError::InvalidPath(format!(
                "illegal transition {} -> {} at position {}",
                pair[0],
                pair[1],
                pos + 1
            ))
        })?;
        score += trans + emissions[pos + 1][pair[1].index()];
    }
    Ok(score)
}
