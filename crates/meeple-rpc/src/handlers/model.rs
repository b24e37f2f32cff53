// crates/meeple-rpc/src/handlers/model.rs
//
// Model info handler: reports which artifact the service is scoring with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use meeple_engine::HybridRecommender;
use meeple_store::LoadedArtifact;

/// Where the served artifact came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelProvenance {
    pub path: String,
    /// Hex SHA-256 of the artifact file.
    pub digest: String,
    pub version: Option<String>,
    pub loaded_at: DateTime<Utc>,
}

impl From<&LoadedArtifact> for ModelProvenance {
    fn from(loaded: &LoadedArtifact) -> Self {
        Self {
            path: loaded.path.clone(),
            digest: loaded.digest.clone(),
            version: loaded.version.clone(),
            loaded_at: loaded.loaded_at,
        }
    }
}

// ---------------------------------------------------------------------------
// GetModelInfo
// ---------------------------------------------------------------------------

/// Request for model information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetModelInfoRequest {}

/// Response describing the loaded model and blend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetModelInfoResponse {
    /// Number of catalog items.
    pub items: usize,
    /// Number of latent factors.
    pub factors: usize,
    pub global_mean: f64,
    pub reg_coeff: f64,
    pub blend_low: f64,
    pub blend_high: f64,
    pub blend_pivot: usize,
    pub absent_content_policy: String,
    /// Present when the artifact was loaded from a file.
    pub provenance: Option<ModelProvenance>,
}

/// Handle a GetModelInfo request.
pub async fn handle_get_model_info(
    _request: GetModelInfoRequest,
    recommender: &HybridRecommender,
    provenance: Option<&ModelProvenance>,
) -> Result<GetModelInfoResponse, String> {
    let artifact = recommender.artifact();
    let blend = recommender.blend_config();
    let policy = serde_json::to_value(blend.absent_content)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    Ok(GetModelInfoResponse {
        items: artifact.len(),
        factors: artifact.num_factors(),
        global_mean: artifact.global_mean(),
        reg_coeff: artifact.reg_coeff(),
        blend_low: blend.low,
        blend_high: blend.high,
        blend_pivot: blend.pivot,
        absent_content_policy: policy,
        provenance: provenance.cloned(),
    })
}
