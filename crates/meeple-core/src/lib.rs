// crates/meeple-core/src/lib.rs
//
// meeple-core: Core types, model artifact, and collaborator traits for the
// Meeple hybrid recommender.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines the immutable model artifact produced by the offline trainer,
// the per-request rating and profile types, the error taxonomy, and the
// trait interface for the external content-similarity collaborator.

pub mod error;
pub mod model;
pub mod rating;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use meeple_core::ModelArtifact;`

// Model artifact
pub use model::{ItemId, ModelArtifact};

// Per-request types
pub use rating::{Rating, Recommendation, ScoreVector, UserProfile};

// Error type
pub use error::MeepleError;

// Traits
pub use traits::{ContentScores, ContentSimilarity};
