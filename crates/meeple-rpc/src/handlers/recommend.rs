// crates/meeple-rpc/src/handlers/recommend.rs
//
// Recommend handler: validates the request body, gathers the content signal,
// and runs the hybrid recommender.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use meeple_core::{ContentSimilarity, ItemId, MeepleError, Rating};
use meeple_engine::{ContentSignal, FoldInStatus, HybridRecommender, RecommendationQuery};

/// Shared handle to the content-similarity collaborator.
pub type SharedContent = Arc<dyn ContentSimilarity>;

/// Boundary limits applied to every recommend request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLimits {
    /// `top_n` used when the request omits it.
    pub default_top_n: usize,
    /// Largest accepted `top_n`.
    pub max_top_n: usize,
    /// Required length of `preferences`, when known.
    pub num_preferences: Option<usize>,
    /// Lowest accepted rating.
    pub min_rating: f64,
    /// Highest accepted rating.
    pub max_rating: f64,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            default_top_n: 20,
            max_top_n: 500,
            num_preferences: None,
            min_rating: 0.0,
            max_rating: 10.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Recommend
// ---------------------------------------------------------------------------

/// Request for personalized recommendations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecommendRequest {
    /// Echoed back in the response (default "unknown").
    #[serde(default)]
    pub username: Option<String>,
    /// All of the user's ratings as `[item_id, rating]` pairs.
    #[serde(default)]
    pub ratings: Vec<(ItemId, f64)>,
    /// Preference flags forwarded to the content collaborator.
    #[serde(default)]
    pub preferences: Option<Vec<bool>>,
    /// Precomputed content scores, one per catalog item in model order.
    #[serde(default)]
    pub content_scores: Option<Vec<f64>>,
    /// Number of recommendations to return.
    #[serde(default)]
    pub top_n: Option<u32>,
}

/// A recommend request that passed boundary validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecommend {
    pub username: String,
    pub ratings: Vec<Rating>,
    pub preferences: Option<Vec<bool>>,
    pub content_scores: Option<Vec<f64>>,
    pub top_n: usize,
}

impl RecommendRequest {
    /// Apply defaults and reject malformed shapes.
    ///
    /// # Errors
    /// * `InvalidRequest` for a bad `top_n`, a rating outside
    ///   `[min_rating, max_rating]`, or both
    ///   `preferences` and `content_scores` being supplied.
    /// * `InvalidInputShape` for a `preferences` or `content_scores` vector of
    ///   the wrong length.
    pub fn validate(
        self,
        limits: &RequestLimits,
        catalog_size: usize,
    ) -> Result<ValidatedRecommend, MeepleError> {
        let top_n = match self.top_n {
            None => limits.default_top_n,
            Some(0) => {
                return Err(MeepleError::InvalidRequest(
                    "top_n must be at least 1".to_string(),
                ))
            }
            Some(n) => n as usize,
        };
        if top_n > limits.max_top_n {
            return Err(MeepleError::InvalidRequest(format!(
                "top_n {} exceeds the maximum of {}",
                top_n, limits.max_top_n
            )));
        }

        let in_range = |r: f64| r >= limits.min_rating && r <= limits.max_rating;
        if let Some((item_id, rating)) = self.ratings.iter().find(|(_, r)| !in_range(*r)) {
            return Err(MeepleError::InvalidRequest(format!(
                "rating {} for item {} is outside [{}, {}]",
                rating, item_id, limits.min_rating, limits.max_rating
            )));
        }

        if self.preferences.is_some() && self.content_scores.is_some() {
            return Err(MeepleError::InvalidRequest(
                "supply either preferences or content_scores, not both".to_string(),
            ));
        }

        if let (Some(prefs), Some(expected)) = (&self.preferences, limits.num_preferences) {
            if prefs.len() != expected {
                return Err(MeepleError::InvalidInputShape {
                    field: "preferences".to_string(),
                    expected,
                    actual: prefs.len(),
                });
            }
        }

        if let Some(scores) = &self.content_scores {
            if scores.len() != catalog_size {
                return Err(MeepleError::InvalidInputShape {
                    field: "content_scores".to_string(),
                    expected: catalog_size,
                    actual: scores.len(),
                });
            }
        }

        Ok(ValidatedRecommend {
            username: self.username.unwrap_or_else(|| "unknown".to_string()),
            ratings: self.ratings.into_iter().map(Rating::from).collect(),
            preferences: self.preferences,
            content_scores: self.content_scores,
            top_n,
        })
    }
}

/// Response carrying the ranked recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendResponse {
    /// Per-request id used in logs.
    pub request_id: Uuid,
    pub username: String,
    /// Weight given to the collaborative signal, in [0, 1].
    pub blend_weight: f64,
    /// How the user profile was derived.
    pub fold_in: FoldInStatus,
    /// Ratings that referenced a catalog item.
    pub ratings_used: usize,
    /// `[item_id, score]` pairs, best first.
    pub recommendations: Vec<(ItemId, f64)>,
}

/// Resolve the content signal for a validated request.
///
/// Precomputed scores win; otherwise preferences go to the collaborator.
/// A collaborator that rejects the preferences rejects the request; any
/// other collaborator failure degrades to an absent signal.
async fn content_signal(
    request: &mut ValidatedRecommend,
    content: Option<&SharedContent>,
    request_id: Uuid,
) -> Result<ContentSignal, MeepleError> {
    if let Some(scores) = request.content_scores.take() {
        return Ok(ContentSignal::Dense(scores));
    }
    let (Some(prefs), Some(service)) = (&request.preferences, content) else {
        return Ok(ContentSignal::Absent);
    };
    match service.similarity(prefs).await {
        Ok(Some(scores)) => Ok(ContentSignal::Sparse(scores)),
        Ok(None) => Ok(ContentSignal::Absent),
        Err(e) if e.is_rejection() => Err(e),
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                "Content service unavailable, continuing without content signal: {}",
                e
            );
            Ok(ContentSignal::Absent)
        }
    }
}

/// Handle a Recommend request.
pub async fn handle_recommend(
    recommender: &Arc<HybridRecommender>,
    content: Option<&SharedContent>,
    limits: &RequestLimits,
    request: RecommendRequest,
) -> Result<RecommendResponse, String> {
    let request_id = Uuid::now_v7();
    let start = std::time::Instant::now();

    let reject = |e: MeepleError| {
        tracing::info!(request_id = %request_id, "Rejected recommend request: {}", e);
        e.to_string()
    };

    let mut validated = request
        .validate(limits, recommender.artifact().len())
        .map_err(reject)?;

    let signal = content_signal(&mut validated, content, request_id)
        .await
        .map_err(reject)?;
    let query = RecommendationQuery {
        ratings: validated.ratings,
        content: signal,
        top_n: validated.top_n,
    };
    let result = recommender.recommend(&query).map_err(|e| e.to_string())?;

    tracing::info!(
        request_id = %request_id,
        username = %validated.username,
        ratings = query.ratings.len(),
        blend_weight = result.blend_weight,
        fold_in = ?result.fold_in_status,
        returned = result.recommendations.len(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "Served recommendations"
    );

    Ok(RecommendResponse {
        request_id,
        username: validated.username,
        blend_weight: result.blend_weight,
        fold_in: result.fold_in_status,
        ratings_used: result.ratings_used,
        recommendations: result
            .recommendations
            .into_iter()
            .map(|r| (r.item_id, r.score))
            .collect(),
    })
}
