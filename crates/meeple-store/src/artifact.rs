// crates/meeple-store/src/artifact.rs
//
// JSON model artifact file format and loader.
//
// File layout (written by the offline trainer):
//   {
//     "version":      "2025-01-14"            (optional),
//     "item_ids":     [174430, 161936, ...],
//     "item_factors": [[f64; F], ...],
//     "item_biases":  [f64, ...],
//     "global_mean":  f64,
//     "reg_coeff":    f64,
//     "item_index":   {"174430": 0, ...}      (optional, must invert item_ids)
//   }

use std::collections::HashMap;
use std::fs;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use meeple_core::{ItemId, MeepleError, ModelArtifact};

/// On-disk representation of a trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactFile {
    /// Trainer-assigned version label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub item_ids: Vec<ItemId>,
    pub item_factors: Vec<Vec<f64>>,
    pub item_biases: Vec<f64>,
    pub global_mean: f64,
    pub reg_coeff: f64,
    /// Redundant inverse of `item_ids`; checked when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_index: Option<HashMap<ItemId, usize>>,
}

impl ArtifactFile {
    /// Validate and convert into a `ModelArtifact`.
    pub fn into_artifact(self) -> Result<ModelArtifact, MeepleError> {
        if let Some(index) = &self.item_index {
            check_index(&self.item_ids, index)?;
        }
        ModelArtifact::new(
            self.item_ids,
            self.item_factors,
            self.item_biases,
            self.global_mean,
            self.reg_coeff,
        )
    }
}

/// `item_index` must map each id to its own position and nothing else.
fn check_index(item_ids: &[ItemId], index: &HashMap<ItemId, usize>) -> Result<(), MeepleError> {
    if index.len() != item_ids.len() {
        return Err(MeepleError::InvalidArtifact(format!(
            "item_index has {} entries for {} item ids",
            index.len(),
            item_ids.len()
        )));
    }
    for (row, id) in item_ids.iter().enumerate() {
        match index.get(id) {
            Some(&r) if r == row => {}
            Some(&r) => {
                return Err(MeepleError::InvalidArtifact(format!(
                    "item_index maps {} to row {}, but item_ids places it at row {}",
                    id, r, row
                )));
            }
            None => {
                return Err(MeepleError::InvalidArtifact(format!(
                    "item_index is missing item {}",
                    id
                )));
            }
        }
    }
    Ok(())
}

/// A validated artifact plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedArtifact {
    pub artifact: ModelArtifact,
    /// Path the artifact was read from.
    pub path: String,
    /// Hex SHA-256 of the file bytes.
    pub digest: String,
    pub version: Option<String>,
    pub loaded_at: DateTime<Utc>,
}

/// Read, validate, and digest the artifact at `path`.
///
/// # Errors
/// * `Storage` if the file cannot be read.
/// * `Serialization` if it is not a valid artifact document.
/// * `EmptyCatalog` / `InvalidArtifact` from validation.
pub fn load_artifact(path: &str) -> Result<LoadedArtifact, MeepleError> {
    let bytes = fs::read(path)
        .map_err(|e| MeepleError::Storage(format!("Failed to read artifact {}: {}", path, e)))?;
    let digest = hex::encode(Sha256::digest(&bytes));

    let file: ArtifactFile = serde_json::from_slice(&bytes)?;
    let version = file.version.clone();
    let artifact = file.into_artifact()?;

    tracing::info!(
        path,
        items = artifact.len(),
        factors = artifact.num_factors(),
        digest = %digest,
        "Loaded model artifact"
    );

    Ok(LoadedArtifact {
        artifact,
        path: path.to_string(),
        digest,
        version,
        loaded_at: Utc::now(),
    })
}

/// Write `file` as pretty-printed JSON to `path`.
pub fn write_artifact(path: &str, file: &ArtifactFile) -> Result<(), MeepleError> {
    let json = serde_json::to_vec_pretty(file)?;
    fs::write(path, json)
        .map_err(|e| MeepleError::Storage(format!("Failed to write artifact {}: {}", path, e)))
}
