// crates/meeple-engine/src/fold_in.rs
//
// Fold-in: derive a temporary user bias and latent vector from a handful of
// ratings against the fixed item-factor model, without retraining it.
//
// Each known rating contributes a design row [1, v_i] with target
// r - (mu + b_i). The ridge system (XᵗX + λ·D)θ = Xᵗy is solved with D equal
// to the identity except D[0][0] = 0, so the user bias is never shrunk.

use serde::{Deserialize, Serialize};

use meeple_core::{MeepleError, ModelArtifact, Rating, UserProfile};

use crate::linalg::NormalEquations;

/// How a fold-in profile was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldInStatus {
    /// No rating referenced a catalog item; the zero profile was used.
    NoRatings,
    /// The ridge system was solved.
    Solved,
    /// The ridge system was singular; the zero profile was used instead.
    FellBack,
}

/// Result of folding a rating list into the model.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldIn {
    pub profile: UserProfile,
    /// Ratings that referenced a catalog item.
    pub ratings_used: usize,
    pub status: FoldInStatus,
}

/// Build the ridge system for `ratings`, skipping items outside the catalog.
///
/// The returned system has dimension F+1 and is already regularized.
pub fn build_normal_equations(artifact: &ModelArtifact, ratings: &[Rating]) -> NormalEquations {
    let dim = artifact.num_factors() + 1;
    let mut system = NormalEquations::new(dim);
    let mut design_row = vec![0.0; dim];
    design_row[0] = 1.0;

    for rating in ratings {
        let row = match artifact.resolve(rating.item_id) {
            Ok(row) => row,
            Err(e) => {
                tracing::debug!("Skipping rating: {}", e);
                continue;
            }
        };
        design_row[1..].copy_from_slice(artifact.factors(row));
        let target = rating.rating - (artifact.global_mean() + artifact.bias(row));
        system.accumulate(&design_row, target);
    }

    system.regularize(artifact.reg_coeff(), 1);
    system
}

/// Solve for the user profile, reporting a singular system as an error.
///
/// An empty rating list, or one whose items are all unknown, yields the zero
/// profile without attempting a solve.
pub fn solve_profile(artifact: &ModelArtifact, ratings: &[Rating]) -> Result<UserProfile, MeepleError> {
    solve_counted(artifact, ratings).map(|(profile, _)| profile)
}

/// Fold `ratings` into the model, falling back to the zero profile when the
/// system cannot be solved.
///
/// Never fails: `SingularSystem` is logged and recorded as
/// `FoldInStatus::FellBack`.
pub fn fold_in(artifact: &ModelArtifact, ratings: &[Rating]) -> FoldIn {
    let zero = || UserProfile::zero(artifact.num_factors());

    match solve_counted(artifact, ratings) {
        Ok((profile, 0)) => FoldIn {
            profile,
            ratings_used: 0,
            status: FoldInStatus::NoRatings,
        },
        Ok((profile, used)) => FoldIn {
            profile,
            ratings_used: used,
            status: FoldInStatus::Solved,
        },
        Err(MeepleError::SingularSystem(reason)) => {
            let used = ratings
                .iter()
                .filter(|r| artifact.row_of(r.item_id).is_some())
                .count();
            tracing::warn!(
                ratings_used = used,
                reg_coeff = artifact.reg_coeff(),
                "Fold-in system is singular ({}); using zero profile",
                reason
            );
            FoldIn {
                profile: zero(),
                ratings_used: used,
                status: FoldInStatus::FellBack,
            }
        }
        Err(e) => {
            // solve_counted only produces SingularSystem today.
            tracing::warn!("Fold-in failed: {}; using zero profile", e);
            FoldIn {
                profile: zero(),
                ratings_used: 0,
                status: FoldInStatus::FellBack,
            }
        }
    }
}

fn solve_counted(
    artifact: &ModelArtifact,
    ratings: &[Rating],
) -> Result<(UserProfile, usize), MeepleError> {
    let f = artifact.num_factors();
    if ratings.is_empty() {
        return Ok((UserProfile::zero(f), 0));
    }

    let system = build_normal_equations(artifact, ratings);
    if system.rows == 0 {
        return Ok((UserProfile::zero(f), 0));
    }

    let theta = system.solve()?;
    Ok((
        UserProfile {
            bias: theta[0],
            factors: theta[1..].to_vec(),
        },
        system.rows,
    ))
}

/// Predicted rating for one catalog row under `profile`.
pub fn predict(artifact: &ModelArtifact, profile: &UserProfile, row: usize) -> f64 {
    let dot: f64 = artifact
        .factors(row)
        .iter()
        .zip(profile.factors.iter())
        .map(|(v, u)| v * u)
        .sum();
    artifact.global_mean() + profile.bias + artifact.bias(row) + dot
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Items A=1, B=2, C=3 with factors [1,0], [0,1], [1,1], mean 5, no biases.
    fn abc_artifact(reg_coeff: f64) -> ModelArtifact {
        ModelArtifact::new(
            vec![1, 2, 3],
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            vec![0.0, 0.0, 0.0],
            5.0,
            reg_coeff,
        )
        .unwrap()
    }

    fn biased_artifact() -> ModelArtifact {
        ModelArtifact::new(
            vec![101, 102, 103, 104, 105],
            vec![
                vec![0.9, -0.2, 0.1],
                vec![-0.4, 0.8, 0.3],
                vec![0.2, 0.1, -0.7],
                vec![0.5, 0.5, 0.5],
                vec![-0.3, -0.6, 0.2],
            ],
            vec![0.4, -0.2, 0.1, 0.3, -0.5],
            6.8,
            0.05,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_ratings_yield_zero_profile() {
        let artifact = abc_artifact(0.1);
        let result = fold_in(&artifact, &[]);
        assert_eq!(result.profile, UserProfile::zero(2));
        assert_eq!(result.status, FoldInStatus::NoRatings);
        assert_eq!(result.ratings_used, 0);
    }

    #[test]
    fn test_only_unknown_items_behave_like_empty() {
        let artifact = abc_artifact(0.1);
        let ratings = vec![Rating::new(42, 9.0), Rating::new(43, 1.0)];
        let result = fold_in(&artifact, &ratings);
        assert_eq!(result, fold_in(&artifact, &[]));
        assert_eq!(solve_profile(&artifact, &ratings).unwrap(), UserProfile::zero(2));
    }

    #[test]
    fn test_single_rating_reproduces_target() {
        let artifact = abc_artifact(0.1);
        let result = fold_in(&artifact, &[Rating::new(1, 8.0)]);
        assert_eq!(result.status, FoldInStatus::Solved);
        assert_eq!(result.ratings_used, 1);

        let predicted_a = predict(&artifact, &result.profile, 0);
        assert!((predicted_a - 8.0).abs() < 1e-9, "predicted(A) = {}", predicted_a);
        // The bias absorbs the residual; the regularized factors stay at zero.
        assert!((result.profile.bias - 3.0).abs() < 1e-9);
        assert!(result.profile.factors.iter().all(|f| f.abs() < 1e-9));
    }

    #[test]
    fn test_unknown_items_are_skipped() {
        let artifact = abc_artifact(0.1);
        let with_noise = vec![Rating::new(77, 1.0), Rating::new(1, 8.0), Rating::new(78, 10.0)];
        let clean = vec![Rating::new(1, 8.0)];
        let noisy = fold_in(&artifact, &with_noise);
        assert_eq!(noisy.profile, fold_in(&artifact, &clean).profile);
        assert_eq!(noisy.ratings_used, 1);
    }

    #[test]
    fn test_zero_regularization_falls_back_on_singular_system() {
        let artifact = abc_artifact(0.0);
        let ratings = vec![Rating::new(1, 8.0)];

        let err = solve_profile(&artifact, &ratings).unwrap_err();
        assert!(matches!(err, MeepleError::SingularSystem(_)));

        let result = fold_in(&artifact, &ratings);
        assert_eq!(result.status, FoldInStatus::FellBack);
        assert_eq!(result.profile, UserProfile::zero(2));
        assert_eq!(result.ratings_used, 1);
    }

    #[test]
    fn test_zero_regularization_with_enough_ratings_solves() {
        let artifact = abc_artifact(0.0);
        // Three independent rows determine bias and both factors exactly.
        let ratings = vec![Rating::new(1, 8.0), Rating::new(2, 6.0), Rating::new(3, 7.0)];
        let result = fold_in(&artifact, &ratings);
        assert_eq!(result.status, FoldInStatus::Solved);
        for (row, r) in ratings.iter().enumerate() {
            assert!((predict(&artifact, &result.profile, row) - r.rating).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fold_in_is_bit_identical_across_calls() {
        let artifact = biased_artifact();
        let ratings = vec![
            Rating::new(101, 9.0),
            Rating::new(103, 4.5),
            Rating::new(105, 7.0),
            Rating::new(999, 3.0),
            Rating::new(101, 8.0),
        ];
        let first = fold_in(&artifact, &ratings);
        let second = fold_in(&artifact, &ratings);
        assert_eq!(first.profile.bias.to_bits(), second.profile.bias.to_bits());
        for (a, b) in first.profile.factors.iter().zip(second.profile.factors.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_duplicates_are_not_collapsed() {
        let artifact = biased_artifact();
        let once = fold_in(&artifact, &[Rating::new(101, 9.0), Rating::new(102, 5.0)]);
        let twice = fold_in(
            &artifact,
            &[Rating::new(101, 9.0), Rating::new(101, 9.0), Rating::new(102, 5.0)],
        );
        assert_eq!(twice.ratings_used, 3);
        assert_ne!(once.profile, twice.profile);
    }

    #[test]
    fn test_solution_satisfies_normal_equations() {
        let artifact = biased_artifact();
        let ratings = vec![
            Rating::new(101, 9.0),
            Rating::new(102, 5.5),
            Rating::new(104, 8.0),
        ];
        let system = build_normal_equations(&artifact, &ratings);
        let profile = solve_profile(&artifact, &ratings).unwrap();
        let mut theta = vec![profile.bias];
        theta.extend_from_slice(&profile.factors);

        for i in 0..system.dim() {
            let lhs: f64 = (0..system.dim()).map(|j| system.lhs[i][j] * theta[j]).sum();
            assert!((lhs - system.rhs[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_bias_is_not_regularized() {
        let artifact = biased_artifact();
        let system = build_normal_equations(&artifact, &[Rating::new(101, 9.0)]);
        // One row: XᵗX[0][0] = 1 with no λ added.
        assert_eq!(system.lhs[0][0], 1.0);
        assert!((system.lhs[1][1] - (0.81 + 0.05)).abs() < 1e-12);
    }
}
