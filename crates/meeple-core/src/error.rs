// crates/meeple-core/src/error.rs

use thiserror::Error;

use crate::model::ItemId;

/// Error taxonomy for the Meeple recommender.
///
/// Only some variants ever reach a caller. `UnknownItem` and `SingularSystem`
/// are recovered inside a request; `EmptyCatalog` and `InvalidArtifact` are
/// fatal at startup.
#[derive(Debug, Clone, Error)]
pub enum MeepleError {
    /// A rating referenced an item id absent from the catalog.
    #[error("Unknown item: {0}")]
    UnknownItem(ItemId),

    /// The fold-in normal equations are singular or ill-conditioned.
    #[error("Singular system: {0}")]
    SingularSystem(String),

    /// A caller-supplied vector has the wrong length.
    #[error("Invalid input shape: '{field}' must have {expected} entries, got {actual}")]
    InvalidInputShape {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// A request field holds a value the engine cannot use.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The model artifact contains no items.
    #[error("Empty catalog: model artifact has no items")]
    EmptyCatalog,

    /// The model artifact violates one of its structural invariants.
    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    /// Reading the artifact from disk failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The content-similarity collaborator failed.
    #[error("Content service error: {0}")]
    Content(String),

    /// Invalid engine configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for MeepleError {
    fn from(e: serde_json::Error) -> Self {
        MeepleError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for MeepleError {
    fn from(e: std::io::Error) -> Self {
        MeepleError::Storage(e.to_string())
    }
}

impl MeepleError {
    /// Whether this error is the caller's fault (a rejected request) rather
    /// than a server-side condition.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            MeepleError::InvalidInputShape { .. } | MeepleError::InvalidRequest(_)
        )
    }
}
