// crates/meeple-store/src/lib.rs
//
// meeple-store: Model artifact storage for the Meeple recommender.
//
// Reads the JSON artifact emitted by the offline trainer, validates it into
// an immutable `ModelArtifact`, and records a content digest and load time so
// the running service can report exactly which model it serves.

pub mod artifact;

// Re-export key types for ergonomic access from downstream crates.
pub use artifact::{load_artifact, write_artifact, ArtifactFile, LoadedArtifact};
