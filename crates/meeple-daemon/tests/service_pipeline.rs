// crates/meeple-daemon/tests/service_pipeline.rs
//
// Integration tests for the Meeple recommender service.
//
// Tests the wired-up pipeline the daemon assembles: artifact file on disk,
// loader, hybrid recommender, and the RPC request handlers.
//
// These tests use the public APIs of the underlying library crates directly
// (meeple-store, meeple-engine, meeple-rpc, meeple-core) since the daemon is
// a binary crate with no lib.rs.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use meeple_core::{ContentScores, ContentSimilarity, ItemId, MeepleError};
use meeple_engine::{AbsentContentPolicy, BlendConfig, FoldInStatus, HybridRecommender};
use meeple_rpc::handlers::model::{handle_get_model_info, GetModelInfoRequest, ModelProvenance};
use meeple_rpc::handlers::recommend::{
    handle_recommend, RecommendRequest, RequestLimits, SharedContent,
};
use meeple_store::{load_artifact, write_artifact, ArtifactFile};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const A: ItemId = 174430;
const B: ItemId = 161936;
const C: ItemId = 224517;

/// Create a temporary file path using UUID to avoid conflicts.
fn temp_artifact_path(label: &str) -> String {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("meeple_test_{}_{}.json", label, Uuid::now_v7()));
    path.to_string_lossy().to_string()
}

/// Three-item catalog with orthogonal-ish factors and zero biases.
fn abc_file() -> ArtifactFile {
    ArtifactFile {
        version: Some("test-abc".to_string()),
        item_ids: vec![A, B, C],
        item_factors: vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
        item_biases: vec![0.0, 0.0, 0.0],
        global_mean: 5.0,
        reg_coeff: 0.1,
        item_index: None,
    }
}

/// Write `file` to a temp path and build a recommender over it.
fn serve(file: &ArtifactFile, blend: BlendConfig) -> (Arc<HybridRecommender>, ModelProvenance) {
    let path = temp_artifact_path("serve");
    write_artifact(&path, file).unwrap();
    let loaded = load_artifact(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    let provenance = ModelProvenance::from(&loaded);
    let recommender = HybridRecommender::new(Arc::new(loaded.artifact), blend).unwrap();
    (Arc::new(recommender), provenance)
}

/// Content collaborator that always answers with the same sparse scores.
struct StaticContent(ContentScores);

#[async_trait]
impl ContentSimilarity for StaticContent {
    async fn similarity(&self, _preferences: &[bool]) -> Result<Option<ContentScores>, MeepleError> {
        Ok(Some(self.0.clone()))
    }
}

fn ids(recs: &[(ItemId, f64)]) -> Vec<ItemId> {
    recs.iter().map(|(id, _)| *id).collect()
}

// ===========================================================================
// Test 1: Single rating, no content
// ===========================================================================

/// One rating of A folds into a pure-bias profile; every CF score ties, so
/// the two remaining items come back in catalog order.
#[tokio::test]
async fn test_single_rating_without_content() {
    let (recommender, _) = serve(&abc_file(), BlendConfig::default());
    let request = RecommendRequest {
        username: Some("alice".to_string()),
        ratings: vec![(A, 8.0)],
        top_n: Some(2),
        ..Default::default()
    };

    let resp = handle_recommend(&recommender, None, &RequestLimits::default(), request)
        .await
        .unwrap();

    assert_eq!(resp.fold_in, FoldInStatus::Solved);
    assert_eq!(resp.ratings_used, 1);
    assert!((resp.blend_weight - 0.35).abs() < 1e-12);
    assert_eq!(ids(&resp.recommendations), vec![B, C]);
    assert!(resp.recommendations.iter().all(|(_, s)| *s == 0.0));
}

// ===========================================================================
// Test 2: Content reorders the candidates
// ===========================================================================

#[tokio::test]
async fn test_precomputed_content_scores_reorder() {
    let (recommender, _) = serve(&abc_file(), BlendConfig::default());
    let request = RecommendRequest {
        ratings: vec![(A, 8.0)],
        content_scores: Some(vec![0.0, 0.2, 0.9]),
        top_n: Some(2),
        ..Default::default()
    };

    let resp = handle_recommend(&recommender, None, &RequestLimits::default(), request)
        .await
        .unwrap();

    assert_eq!(ids(&resp.recommendations), vec![C, B]);
    assert!((resp.recommendations[0].1 - 0.65).abs() < 1e-12);
}

#[tokio::test]
async fn test_content_service_scores_are_joined_by_item_id() {
    let (recommender, _) = serve(&abc_file(), BlendConfig::default());
    // Unknown id 999 is dropped; C is missing and scores zero.
    let content: SharedContent = Arc::new(StaticContent(vec![(B, 0.7), (999, 5.0), (A, 0.1)]));
    let request = RecommendRequest {
        ratings: vec![(A, 8.0)],
        preferences: Some(vec![true, false, true]),
        top_n: Some(2),
        ..Default::default()
    };

    let resp = handle_recommend(&recommender, Some(&content), &RequestLimits::default(), request)
        .await
        .unwrap();

    assert_eq!(ids(&resp.recommendations), vec![B, C]);
    assert!(resp.recommendations[0].1 > resp.recommendations[1].1);
}

// ===========================================================================
// Test 3: Degenerate inputs
// ===========================================================================

#[tokio::test]
async fn test_unknown_ratings_only_behaves_like_cold_start() {
    let (recommender, _) = serve(&abc_file(), BlendConfig::default());
    let request = RecommendRequest {
        ratings: vec![(42, 9.0), (43, 1.0)],
        ..Default::default()
    };

    let resp = handle_recommend(&recommender, None, &RequestLimits::default(), request)
        .await
        .unwrap();

    assert_eq!(resp.fold_in, FoldInStatus::NoRatings);
    assert_eq!(resp.ratings_used, 0);
    // The blend weight counts every supplied rating.
    assert!((resp.blend_weight - 0.4).abs() < 1e-12);
    assert_eq!(ids(&resp.recommendations), vec![A, B, C]);
}

#[tokio::test]
async fn test_zero_regularization_falls_back_to_bias_ranking() {
    let mut file = abc_file();
    file.reg_coeff = 0.0;
    file.item_biases = vec![0.1, -0.4, 0.6];
    let (recommender, _) = serve(&file, BlendConfig::default());
    let request = RecommendRequest {
        ratings: vec![(B, 4.0)],
        ..Default::default()
    };

    let resp = handle_recommend(&recommender, None, &RequestLimits::default(), request)
        .await
        .unwrap();

    assert_eq!(resp.fold_in, FoldInStatus::FellBack);
    assert_eq!(ids(&resp.recommendations), vec![C, A]);
}

#[tokio::test]
async fn test_collaborative_only_policy_without_content() {
    let blend = BlendConfig {
        absent_content: AbsentContentPolicy::CollaborativeOnly,
        ..Default::default()
    };
    let mut file = abc_file();
    file.item_biases = vec![0.0, 1.0, 0.5];
    let (recommender, _) = serve(&file, blend);

    let resp = handle_recommend(
        &recommender,
        None,
        &RequestLimits::default(),
        RecommendRequest::default(),
    )
    .await
    .unwrap();

    assert_eq!(resp.blend_weight, 1.0);
    assert_eq!(ids(&resp.recommendations), vec![B, C, A]);
    assert_eq!(resp.recommendations[0].1, 1.0);
}

// ===========================================================================
// Test 4: Loader and model info
// ===========================================================================

#[tokio::test]
async fn test_model_info_reports_provenance() {
    let (recommender, provenance) = serve(&abc_file(), BlendConfig::default());
    let info = handle_get_model_info(GetModelInfoRequest {}, &recommender, Some(&provenance))
        .await
        .unwrap();

    assert_eq!(info.items, 3);
    assert_eq!(info.factors, 2);
    assert_eq!(info.absent_content_policy, "zero");
    let provenance = info.provenance.unwrap();
    assert_eq!(provenance.version.as_deref(), Some("test-abc"));
    assert_eq!(provenance.digest.len(), 64);
}

#[test]
fn test_empty_catalog_refuses_to_load() {
    let file = ArtifactFile {
        version: None,
        item_ids: vec![],
        item_factors: vec![],
        item_biases: vec![],
        global_mean: 5.0,
        reg_coeff: 0.1,
        item_index: None,
    };
    let path = temp_artifact_path("empty");
    write_artifact(&path, &file).unwrap();
    let result = load_artifact(&path);
    let _ = std::fs::remove_file(&path);
    assert!(matches!(result, Err(MeepleError::EmptyCatalog)));
}

#[test]
fn test_missing_artifact_is_storage_error() {
    let path = temp_artifact_path("missing");
    assert!(matches!(load_artifact(&path), Err(MeepleError::Storage(_))));
}
