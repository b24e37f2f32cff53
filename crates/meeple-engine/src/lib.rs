// crates/meeple-engine/src/lib.rs
//
// meeple-engine: the online hybrid scoring engine for the Meeple recommender.
//
// A request flows through four stages: the fold-in solver derives a
// temporary user profile against the fixed item-factor model, the compositor
// turns it into CF scores and blends them with content scores, and the
// selector drops already-rated items and ranks the rest. `HybridRecommender`
// runs the whole pipeline over a shared, immutable `ModelArtifact`.

pub mod compositor;
pub mod fold_in;
pub mod linalg;
pub mod recommender;
pub mod selector;

pub use compositor::{AbsentContentPolicy, BlendConfig, Composite};
pub use fold_in::{FoldIn, FoldInStatus};
pub use recommender::{ContentSignal, HybridRecommender, RecommendationQuery, RecommendationSet};
