// crates/meeple-engine/src/compositor.rs
//
// Hybrid score composition: CF predictions from the folded-in profile are
// min-max normalized alongside the content scores and mixed with a weight
// that grows with the number of ratings the user supplied.

use serde::{Deserialize, Serialize};

use meeple_core::{ContentScores, MeepleError, ModelArtifact, ScoreVector, UserProfile};

use crate::fold_in::predict;

/// What to do with the blend weight when no content signal is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentContentPolicy {
    /// Treat the content vector as all zeros; the hybrid score is
    /// `alpha * cf_norm`.
    #[default]
    Zero,
    /// Put the full weight on CF (`alpha = 1.0`).
    CollaborativeOnly,
}

/// Parameters of the confidence-adaptive blend weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendConfig {
    /// Weight on CF with no ratings.
    pub low: f64,
    /// Weight on CF once `pivot` ratings are reached.
    pub high: f64,
    /// Rating count at which the weight saturates.
    pub pivot: usize,
    #[serde(default)]
    pub absent_content: AbsentContentPolicy,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            low: 0.3,
            high: 0.8,
            pivot: 10,
            absent_content: AbsentContentPolicy::Zero,
        }
    }
}

impl BlendConfig {
    /// Check `0 <= low <= high <= 1` and `pivot >= 1`.
    pub fn validate(&self) -> Result<(), MeepleError> {
        if !(self.low.is_finite() && self.high.is_finite()) {
            return Err(MeepleError::Config("blend weights must be finite".to_string()));
        }
        if self.low < 0.0 || self.high > 1.0 || self.low > self.high {
            return Err(MeepleError::Config(format!(
                "blend weights must satisfy 0 <= low <= high <= 1 (low = {}, high = {})",
                self.low, self.high
            )));
        }
        if self.pivot == 0 {
            return Err(MeepleError::Config("blend pivot must be at least 1".to_string()));
        }
        Ok(())
    }

    /// CF weight for a user with `num_ratings` ratings.
    pub fn alpha(&self, num_ratings: usize) -> f64 {
        dynamic_alpha(num_ratings, self.low, self.high, self.pivot)
    }

    /// CF weight actually applied, taking an absent content signal into account.
    pub fn effective_alpha(&self, num_ratings: usize, content_present: bool) -> f64 {
        match (content_present, self.absent_content) {
            (false, AbsentContentPolicy::CollaborativeOnly) => 1.0,
            _ => self.alpha(num_ratings),
        }
    }
}

/// Linear ramp from `low` (no ratings) to `high` (`pivot` or more ratings).
///
/// Sparse histories lean on content similarity, rich ones on CF.
pub fn dynamic_alpha(num_ratings: usize, low: f64, high: f64, pivot: usize) -> f64 {
    if num_ratings >= pivot {
        return high;
    }
    low + (high - low) * (num_ratings as f64 / pivot as f64)
}

/// CF prediction for every catalog item.
pub fn cf_scores(artifact: &ModelArtifact, profile: &UserProfile) -> ScoreVector {
    (0..artifact.len()).map(|row| predict(artifact, profile, row)).collect()
}

/// Min-max normalize to [0, 1]. A flat (or empty) vector maps to all zeros.
///
/// Finite inputs whose spread exceeds `f64::MAX` are scaled by one half
/// before subtracting, so the result stays finite.
pub fn min_max_normalize(scores: &[f64]) -> ScoreVector {
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max > min) {
        return vec![0.0; scores.len()];
    }
    let range = max - min;
    if range.is_finite() {
        return scores.iter().map(|&x| (x - min) / range).collect();
    }
    let half_range = max / 2.0 - min / 2.0;
    scores
        .iter()
        .map(|&x| ((x / 2.0 - min / 2.0) / half_range).clamp(0.0, 1.0))
        .collect()
}

/// `alpha * cf + (1 - alpha) * cb`, element-wise.
pub fn blend(cf_norm: &[f64], cb_norm: &[f64], alpha: f64) -> ScoreVector {
    debug_assert_eq!(cf_norm.len(), cb_norm.len());
    cf_norm
        .iter()
        .zip(cb_norm.iter())
        .map(|(cf, cb)| alpha * cf + (1.0 - alpha) * cb)
        .collect()
}

/// Spread id-keyed content scores over catalog rows.
///
/// Rows the collaborator did not score stay at zero; ids outside the catalog
/// are dropped; a repeated id keeps its last score.
pub fn align_content_scores(artifact: &ModelArtifact, scores: &ContentScores) -> ScoreVector {
    let mut dense = vec![0.0; artifact.len()];
    let mut dropped = 0usize;
    for &(item_id, score) in scores {
        match artifact.row_of(item_id) {
            Some(row) => dense[row] = score,
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::debug!(dropped, "Content scores referenced items outside the catalog");
    }
    dense
}

/// Blended scores for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub hybrid: ScoreVector,
    /// CF weight that was applied.
    pub alpha: f64,
    pub content_present: bool,
}

/// Compute CF scores for `profile`, normalize both signals, and blend them.
///
/// # Errors
/// * `InvalidInputShape` if `content` is present with a length other than N.
/// * `InvalidRequest` if `content` contains a non-finite value.
pub fn compose(
    artifact: &ModelArtifact,
    profile: &UserProfile,
    num_ratings: usize,
    content: Option<&[f64]>,
    config: &BlendConfig,
) -> Result<Composite, MeepleError> {
    let n = artifact.len();

    let cb_norm = match content {
        Some(cb) => {
            if cb.len() != n {
                return Err(MeepleError::InvalidInputShape {
                    field: "content_scores".to_string(),
                    expected: n,
                    actual: cb.len(),
                });
            }
            if let Some(pos) = cb.iter().position(|v| !v.is_finite()) {
                return Err(MeepleError::InvalidRequest(format!(
                    "content score at position {} is not finite",
                    pos
                )));
            }
            min_max_normalize(cb)
        }
        None => vec![0.0; n],
    };

    let cf_norm = min_max_normalize(&cf_scores(artifact, profile));
    let alpha = config.effective_alpha(num_ratings, content.is_some());

    Ok(Composite {
        hybrid: blend(&cf_norm, &cb_norm, alpha),
        alpha,
        content_present: content.is_some(),
    })
}
