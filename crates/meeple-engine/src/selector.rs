// crates/meeple-engine/src/selector.rs
//
// Exclusion and top-N selection over a blended score vector.
//
// Ranking order: score descending, then catalog row-index ascending. The
// order is total (f64::total_cmp), so equal inputs always produce the same
// list.

use std::cmp::Ordering;
use std::collections::HashSet;

use meeple_core::{ItemId, ModelArtifact, Recommendation};

/// Force the score of every rated catalog item to negative infinity.
///
/// Returns the number of rows excluded. Rated ids outside the catalog are
/// ignored.
pub fn exclude_rated(hybrid: &mut [f64], artifact: &ModelArtifact, rated: &HashSet<ItemId>) -> usize {
    let mut excluded = 0;
    for &item_id in rated {
        if let Some(row) = artifact.row_of(item_id) {
            hybrid[row] = f64::NEG_INFINITY;
            excluded += 1;
        }
    }
    excluded
}

/// The `n` highest finite scores, best first.
///
/// Returns fewer than `n` entries when fewer rows have a finite score.
pub fn select_top_n(hybrid: &[f64], artifact: &ModelArtifact, n: usize) -> Vec<Recommendation> {
    let rank = |a: &usize, b: &usize| -> Ordering {
        hybrid[*b].total_cmp(&hybrid[*a]).then_with(|| a.cmp(b))
    };

    let mut candidates: Vec<usize> = (0..hybrid.len())
        .filter(|&row| hybrid[row].is_finite())
        .collect();

    if n == 0 {
        return Vec::new();
    }
    if n < candidates.len() {
        candidates.select_nth_unstable_by(n - 1, rank);
        candidates.truncate(n);
    }
    candidates.sort_unstable_by(rank);

    candidates
        .into_iter()
        .map(|row| Recommendation {
            item_id: artifact.item_id(row),
            score: hybrid[row],
        })
        .collect()
}

/// Exclude `rated` items, then select the top `n`.
pub fn recommend_top_n(
    mut hybrid: Vec<f64>,
    artifact: &ModelArtifact,
    rated: &HashSet<ItemId>,
    n: usize,
) -> Vec<Recommendation> {
    exclude_rated(&mut hybrid, artifact, rated);
    select_top_n(&hybrid, artifact, n)
}
