// crates/meeple-core/src/model.rs
//
// The trained model artifact: item latent factors, item biases, global mean,
// and the item-id <-> row-index mapping emitted by the offline trainer.
//
// Constructed once at process start through `ModelArtifact::new`, which
// enforces every structural invariant, then shared read-only (usually as
// `Arc<ModelArtifact>`) by all in-flight requests.

use std::collections::HashMap;

use crate::error::MeepleError;

/// Raw catalog item identifier (a board-game id).
pub type ItemId = u64;

/// Immutable item-factor model used for fold-in and CF scoring.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    /// item_factors[row] = latent vector of length `num_factors`.
    item_factors: Vec<Vec<f64>>,
    /// item_biases[row] = learned item bias.
    item_biases: Vec<f64>,
    /// Global mean rating of the training set.
    global_mean: f64,
    /// item_ids[row] = raw identifier.
    item_ids: Vec<ItemId>,
    /// Inverse of `item_ids`.
    item_index: HashMap<ItemId, usize>,
    /// Ridge coefficient applied to the latent part of the fold-in solve.
    reg_coeff: f64,
    /// Number of latent factors (F).
    num_factors: usize,
}

impl ModelArtifact {
    /// Build an artifact from its raw parts.
    ///
    /// # Errors
    /// * `EmptyCatalog` if there are no items.
    /// * `InvalidArtifact` if the per-item arrays disagree in length, a factor
    ///   row has the wrong width, an item id repeats, or any value is not
    ///   finite (or `reg_coeff` is negative).
    pub fn new(
        item_ids: Vec<ItemId>,
        item_factors: Vec<Vec<f64>>,
        item_biases: Vec<f64>,
        global_mean: f64,
        reg_coeff: f64,
    ) -> Result<Self, MeepleError> {
        if item_ids.is_empty() {
            return Err(MeepleError::EmptyCatalog);
        }
        if item_factors.len() != item_ids.len() || item_biases.len() != item_ids.len() {
            return Err(MeepleError::InvalidArtifact(format!(
                "length mismatch: {} item ids, {} factor rows, {} biases",
                item_ids.len(),
                item_factors.len(),
                item_biases.len()
            )));
        }
        if !global_mean.is_finite() {
            return Err(MeepleError::InvalidArtifact(
                "global_mean is not finite".to_string(),
            ));
        }
        if !reg_coeff.is_finite() || reg_coeff < 0.0 {
            return Err(MeepleError::InvalidArtifact(format!(
                "reg_coeff must be finite and >= 0, got {}",
                reg_coeff
            )));
        }

        let num_factors = item_factors[0].len();
        for (row, factors) in item_factors.iter().enumerate() {
            if factors.len() != num_factors {
                return Err(MeepleError::InvalidArtifact(format!(
                    "factor row {} has {} entries, expected {}",
                    row,
                    factors.len(),
                    num_factors
                )));
            }
            if factors.iter().any(|v| !v.is_finite()) {
                return Err(MeepleError::InvalidArtifact(format!(
                    "factor row {} contains a non-finite value",
                    row
                )));
            }
        }
        if let Some(row) = item_biases.iter().position(|b| !b.is_finite()) {
            return Err(MeepleError::InvalidArtifact(format!(
                "bias for row {} is not finite",
                row
            )));
        }

        let mut item_index = HashMap::with_capacity(item_ids.len());
        for (row, &id) in item_ids.iter().enumerate() {
            if item_index.insert(id, row).is_some() {
                return Err(MeepleError::InvalidArtifact(format!(
                    "duplicate item id {}",
                    id
                )));
            }
        }

        Ok(Self {
            item_factors,
            item_biases,
            global_mean,
            item_ids,
            item_index,
            reg_coeff,
            num_factors,
        })
    }

    /// Number of catalog items (N).
    pub fn len(&self) -> usize {
        self.item_ids.len()
    }

    /// Always false for a constructed artifact; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }

    /// Number of latent factors (F).
    pub fn num_factors(&self) -> usize {
        self.num_factors
    }

    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }

    pub fn reg_coeff(&self) -> f64 {
        self.reg_coeff
    }

    /// Latent vector for a row-index.
    pub fn factors(&self, row: usize) -> &[f64] {
        &self.item_factors[row]
    }

    /// Item bias for a row-index.
    pub fn bias(&self, row: usize) -> f64 {
        self.item_biases[row]
    }

    /// Raw identifier for a row-index.
    pub fn item_id(&self, row: usize) -> ItemId {
        self.item_ids[row]
    }

    /// All raw identifiers in row order.
    pub fn item_ids(&self) -> &[ItemId] {
        &self.item_ids
    }

    /// Row-index for a raw identifier, if the item is in the catalog.
    pub fn row_of(&self, id: ItemId) -> Option<usize> {
        self.item_index.get(&id).copied()
    }

    /// Like `row_of`, but reports a missing item as `UnknownItem`.
    pub fn resolve(&self, id: ItemId) -> Result<usize, MeepleError> {
        self.row_of(id).ok_or(MeepleError::UnknownItem(id))
    }
}
