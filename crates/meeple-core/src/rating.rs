// crates/meeple-core/src/rating.rs
//
// Per-request types: ratings in, profile and recommendations out.
// None of these outlive the request that created them.

use serde::{Deserialize, Serialize};

use crate::model::ItemId;

/// Dense per-item scores, index-aligned with `ModelArtifact::item_ids`.
pub type ScoreVector = Vec<f64>;

/// A single (item, rating) pair supplied by the user.
///
/// Duplicates are allowed and not collapsed; ids outside the catalog are
/// skipped by the fold-in solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub item_id: ItemId,
    pub rating: f64,
}

impl Rating {
    pub fn new(item_id: ItemId, rating: f64) -> Self {
        Self { item_id, rating }
    }
}

impl From<(ItemId, f64)> for Rating {
    fn from((item_id, rating): (ItemId, f64)) -> Self {
        Self { item_id, rating }
    }
}

/// Ephemeral user bias and latent vector derived by fold-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User bias (b_u), never regularized.
    pub bias: f64,
    /// Latent vector (u) of length F.
    pub factors: Vec<f64>,
}

impl UserProfile {
    /// The zero-ratings default: no bias, zero latent vector.
    pub fn zero(num_factors: usize) -> Self {
        Self {
            bias: 0.0,
            factors: vec![0.0; num_factors],
        }
    }
}

/// One ranked recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub item_id: ItemId,
    pub score: f64,
}
