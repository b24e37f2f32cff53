// crates/meeple-core/src/traits.rs

use async_trait::async_trait;

use crate::error::MeepleError;
use crate::model::ItemId;

/// Per-item content similarity scores keyed by raw item id.
///
/// Items the collaborator does not mention score zero once aligned to the
/// catalog; ids outside the catalog are dropped.
pub type ContentScores = Vec<(ItemId, f64)>;

/// The external content-based similarity collaborator.
///
/// Implemented by meeple-daemon (HTTP client). Given the user's stated
/// preference flags, returns a similarity score per catalog item, or `None`
/// when no content signal is available.
#[async_trait]
pub trait ContentSimilarity: Send + Sync {
    /// Score catalog items against a preference vector.
    async fn similarity(&self, preferences: &[bool]) -> Result<Option<ContentScores>, MeepleError>;
}
