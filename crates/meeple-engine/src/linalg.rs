// crates/meeple-engine/src/linalg.rs
//
// Dense normal-equation accumulation and a Cholesky solver for the small
// (F+1)x(F+1) ridge systems built by fold-in.

use meeple_core::MeepleError;

/// Pivots at or below this fraction of the largest diagonal entry are
/// treated as zero.
pub const PIVOT_TOLERANCE: f64 = 1e-10;

/// The system `(XᵗX + λ·D) θ = Xᵗy`, accumulated one design row at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalEquations {
    /// XᵗX (+ λ·D once regularized), dense and symmetric.
    pub lhs: Vec<Vec<f64>>,
    /// Xᵗy.
    pub rhs: Vec<f64>,
    /// Number of design rows folded in so far.
    pub rows: usize,
}

impl NormalEquations {
    /// Create an empty system of dimension `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            lhs: vec![vec![0.0; dim]; dim],
            rhs: vec![0.0; dim],
            rows: 0,
        }
    }

    pub fn dim(&self) -> usize {
        self.rhs.len()
    }

    /// Add one design row `x` with target `y`: lhs += x xᵗ, rhs += y x.
    pub fn accumulate(&mut self, x: &[f64], y: f64) {
        debug_assert_eq!(x.len(), self.dim());
        for (i, &xi) in x.iter().enumerate() {
            if xi == 0.0 {
                continue;
            }
            for (j, &xj) in x.iter().enumerate() {
                self.lhs[i][j] += xi * xj;
            }
            self.rhs[i] += xi * y;
        }
        self.rows += 1;
    }

    /// Add `lambda` to every diagonal entry from index `from` onward.
    ///
    /// `from = 1` leaves the bias coordinate unregularized.
    pub fn regularize(&mut self, lambda: f64, from: usize) {
        for i in from..self.dim() {
            self.lhs[i][i] += lambda;
        }
    }

    /// Solve the accumulated system.
    pub fn solve(&self) -> Result<Vec<f64>, MeepleError> {
        cholesky_solve(&self.lhs, &self.rhs)
    }
}

/// Solve `A x = b` for symmetric positive definite `A` via A = L Lᵗ.
///
/// # Errors
/// `SingularSystem` if `A` is not square, is not positive definite, or a
/// pivot falls below `PIVOT_TOLERANCE` relative to the largest diagonal
/// entry. A non-finite solution is reported the same way.
pub fn cholesky_solve(a: &[Vec<f64>], b: &[f64]) -> Result<Vec<f64>, MeepleError> {
    let n = a.len();
    if b.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(MeepleError::SingularSystem(format!(
            "system is not square: {} rows, rhs length {}",
            n,
            b.len()
        )));
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    let scale = (0..n).map(|i| a[i][i].abs()).fold(0.0_f64, f64::max);
    if !scale.is_finite() || scale == 0.0 {
        return Err(MeepleError::SingularSystem(format!(
            "degenerate diagonal (max |a_ii| = {})",
            scale
        )));
    }
    let threshold = PIVOT_TOLERANCE * scale;

    // Lower-triangular factor, row-major.
    let mut l = vec![vec![0.0_f64; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let diag = a[i][i] - sum;
                // Negated comparison so NaN pivots are rejected too.
                if !(diag > threshold) {
                    return Err(MeepleError::SingularSystem(format!(
                        "pivot {} is {:e} (threshold {:e})",
                        i, diag, threshold
                    )));
                }
                l[i][i] = diag.sqrt();
            } else {
                l[i][j] = (a[i][j] - sum) / l[j][j];
            }
        }
    }

    // Forward substitution: L y = b
    let mut y = vec![0.0_f64; n];
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[i][j] * y[j]).sum();
        y[i] = (b[i] - sum) / l[i][i];
    }

    // Backward substitution: Lᵗ x = y
    let mut x = vec![0.0_f64; n];
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[j][i] * x[j]).sum();
        x[i] = (y[i] - sum) / l[i][i];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(MeepleError::SingularSystem(
            "solution is not finite".to_string(),
        ));
    }

    Ok(x)
}
