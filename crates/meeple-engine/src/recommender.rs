// crates/meeple-engine/src/recommender.rs
//
// HybridRecommender: the full per-request pipeline over a shared model.
//
// Holds an `Arc<ModelArtifact>` that is never mutated, so one recommender can
// serve any number of concurrent requests without locking. Everything a
// request produces (profile, score vectors, result list) is owned by that
// request alone.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use meeple_core::{
    ContentScores, ItemId, MeepleError, ModelArtifact, Rating, Recommendation, ScoreVector,
};

use crate::compositor::{align_content_scores, compose, BlendConfig};
use crate::fold_in::{fold_in, FoldInStatus};
use crate::selector::recommend_top_n;

/// The content-based signal attached to a request.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ContentSignal {
    /// No content signal; see `AbsentContentPolicy`.
    #[default]
    Absent,
    /// Scores already aligned to catalog rows (length N).
    Dense(ScoreVector),
    /// Scores keyed by item id, as returned by the content collaborator.
    Sparse(ContentScores),
}

/// One recommendation request, after boundary validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationQuery {
    pub ratings: Vec<Rating>,
    pub content: ContentSignal,
    pub top_n: usize,
}

/// The ranked output of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    /// CF weight applied in the blend, in [0, 1].
    pub blend_weight: f64,
    pub fold_in_status: FoldInStatus,
    /// Ratings that referenced a catalog item.
    pub ratings_used: usize,
    /// Best first.
    pub recommendations: Vec<Recommendation>,
}

/// Runs fold-in, composition, and selection against a shared artifact.
#[derive(Debug, Clone)]
pub struct HybridRecommender {
    artifact: Arc<ModelArtifact>,
    blend: BlendConfig,
}

impl HybridRecommender {
    /// Create a recommender. Fails if `blend` is invalid.
    pub fn new(artifact: Arc<ModelArtifact>, blend: BlendConfig) -> Result<Self, MeepleError> {
        blend.validate()?;
        Ok(Self { artifact, blend })
    }

    pub fn artifact(&self) -> &Arc<ModelArtifact> {
        &self.artifact
    }

    pub fn blend_config(&self) -> &BlendConfig {
        &self.blend
    }

    /// Produce the top-N recommendations for one user.
    ///
    /// # Errors
    /// * `InvalidRequest` for `top_n == 0` or a non-finite rating.
    /// * `InvalidInputShape` / `InvalidRequest` from the content signal.
    pub fn recommend(&self, query: &RecommendationQuery) -> Result<RecommendationSet, MeepleError> {
        if query.top_n == 0 {
            return Err(MeepleError::InvalidRequest("top_n must be at least 1".to_string()));
        }
        if let Some(bad) = query.ratings.iter().find(|r| !r.rating.is_finite()) {
            return Err(MeepleError::InvalidRequest(format!(
                "rating for item {} is not finite",
                bad.item_id
            )));
        }

        let artifact = self.artifact.as_ref();
        let folded = fold_in(artifact, &query.ratings);

        let aligned;
        let content: Option<&[f64]> = match &query.content {
            ContentSignal::Absent => None,
            ContentSignal::Dense(scores) => Some(scores.as_slice()),
            ContentSignal::Sparse(scores) => {
                aligned = align_content_scores(artifact, scores);
                Some(aligned.as_slice())
            }
        };

        // The ramp counts every submitted rating, known to the model or not.
        let composite = compose(
            artifact,
            &folded.profile,
            query.ratings.len(),
            content,
            &self.blend,
        )?;

        let rated: HashSet<ItemId> = query.ratings.iter().map(|r| r.item_id).collect();
        let recommendations = recommend_top_n(composite.hybrid, artifact, &rated, query.top_n);

        tracing::debug!(
            ratings = query.ratings.len(),
            ratings_used = folded.ratings_used,
            status = ?folded.status,
            alpha = composite.alpha,
            content = composite.content_present,
            returned = recommendations.len(),
            "Recommendation computed"
        );

        Ok(RecommendationSet {
            blend_weight: composite.alpha,
            fold_in_status: folded.status,
            ratings_used: folded.ratings_used,
            recommendations,
        })
    }
}
