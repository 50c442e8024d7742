//! Least-squares solvers on top of `nalgebra`.

use nalgebra::{DMatrix, DVector};

/// Relative size below which a Cholesky pivot counts as zero.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Result of an ordinary or ridge least-squares fit.
#[derive(Debug, Clone)]
pub struct LinearFit {
    pub coefficients: DVector<f64>,
    pub residuals: DVector<f64>,
    /// Inverse of the (penalised) normal matrix, `(XᵀX + Λ)⁻¹`.
    pub normal_inverse: DMatrix<f64>,
}

impl LinearFit {
    pub fn rss(&self) -> f64 {
        self.residuals.norm_squared()
    }

    /// `xᵀ (XᵀX + Λ)⁻¹ x` for a new design row.
    pub fn leverage(&self, row: &DVector<f64>) -> f64 {
        (row.transpose() * &self.normal_inverse * row)[(0, 0)]
    }
}

/// Ordinary least squares via Cholesky on the normal equations.
///
/// Returns `None` when the design is rank deficient.
pub fn ordinary_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<LinearFit> {
    ridge_least_squares(x, y, &vec![0.0; x.ncols()])
}

/// Least squares with a per-coefficient ridge penalty `Λ = diag(penalties)`.
///
/// Penalised coefficients make the system solvable even with more columns
/// than rows; the unpenalised ones still need full column rank.
pub fn ridge_least_squares(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    penalties: &[f64],
) -> Option<LinearFit> {
    if x.nrows() != y.len() || penalties.len() != x.ncols() || x.ncols() == 0 {
        return None;
    }
    let unpenalised = penalties.iter().filter(|&&p| p <= 0.0).count();
    if x.nrows() < unpenalised {
        return None;
    }

    let mut normal = x.tr_mul(x);
    for (i, p) in penalties.iter().enumerate() {
        normal[(i, i)] += p;
    }
    let scale = normal.diagonal().amax();
    if !(scale > 0.0) {
        return None;
    }
    let cholesky = normal.cholesky()?;
    if cholesky
        .l_dirty()
        .diagonal()
        .iter()
        .any(|d| d * d <= PIVOT_TOLERANCE * scale)
    {
        return None;
    }
    let coefficients = cholesky.solve(&x.tr_mul(y));
    if coefficients.iter().any(|c| !c.is_finite()) {
        return None;
    }
    let residuals = y - x * &coefficients;

    Some(LinearFit {
        coefficients,
        residuals,
        normal_inverse: cholesky.inverse(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_line() {
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0]);
        let y = DVector::from_vec(vec![1.0, 3.0, 5.0, 7.0]);
        let fit = ordinary_least_squares(&x, &y).unwrap();
        assert!((fit.coefficients[0] - 1.0).abs() < 1e-10);
        assert!((fit.coefficients[1] - 2.0).abs() < 1e-10);
        assert!(fit.rss() < 1e-18);
    }

    #[test]
    fn rank_deficient_design_is_rejected() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(ordinary_least_squares(&x, &y).is_none());
    }

    #[test]
    fn ridge_shrinks_penalised_coefficient() {
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0]);
        let y = DVector::from_vec(vec![1.0, 3.0, 5.0, 7.0]);
        let fit = ridge_least_squares(&x, &y, &[0.0, 10.0]).unwrap();
        assert!(fit.coefficients[1].abs() < 2.0);
        assert!(fit.coefficients[1] > 0.0);
    }

    #[test]
    fn ridge_solves_wide_design() {
        let x = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 0.5, 1.0, 1.0, -0.5]);
        let y = DVector::from_vec(vec![1.0, 2.0]);
        let fit = ridge_least_squares(&x, &y, &[0.0, 0.0, 1.0]).unwrap();
        assert!(fit.coefficients.iter().all(|c| c.is_finite()));
        assert!(ordinary_least_squares(&x, &y).is_none());
    }

    #[test]
    fn leverage_is_positive_for_nonzero_row() {
        let x = DMatrix::from_row_slice(3, 1, &[1.0, 1.0, 1.0]);
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let fit = ordinary_least_squares(&x, &y).unwrap();
        let row = DVector::from_vec(vec![1.0]);
        assert!((fit.leverage(&row) - 1.0 / 3.0).abs() < 1e-12);
    }
}
