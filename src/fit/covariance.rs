//! Covariance and correlation from the Hessian at the minimum.
//!
//! Under the Laplace approximation the inverse of the NLL Hessian at the
//! minimum is the parameter covariance matrix. The factorization and
//! inversion are hand-rolled Cholesky on ndarray; a Hessian that is not
//! positive definite surfaces as `SingularMatrix`, which the fitter records
//! in the result rather than raising.

use crate::error::{MlFitError, Result};
use ndarray::{Array1, Array2};

/// Lower-triangular Cholesky factor of a symmetric matrix.
///
/// Returns `None` when the matrix is not positive definite.
pub(crate) fn cholesky_factor(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return None;
    }

    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }

            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[[i, i]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }

    Some(l)
}

/// Solve `L L^T x = b` given the lower Cholesky factor `L`.
pub(crate) fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    // Forward substitution (L y = b)
    let mut y = b.clone();
    for i in 0..n {
        for j in 0..i {
            let yj = y[j];
            y[i] -= l[[i, j]] * yj;
        }
        y[i] /= l[[i, i]];
    }

    // Backward substitution (L^T x = y)
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        x[i] = y[i];
        for j in (i + 1)..n {
            x[i] -= l[[j, i]] * x[j];
        }
        x[i] /= l[[i, i]];
    }

    x
}

/// Invert the Hessian to get the covariance matrix.
///
/// Fails with `SingularMatrix` when the Hessian is not positive definite.
pub fn covariance_from_hessian(hessian: &Array2<f64>) -> Result<Array2<f64>> {
    let n = hessian.nrows();
    let l = cholesky_factor(hessian).ok_or(MlFitError::SingularMatrix)?;

    // Solve H x = e_i column by column
    let mut cov = Array2::zeros((n, n));
    for i in 0..n {
        let mut e = Array1::zeros(n);
        e[i] = 1.0;
        let col = cholesky_solve(&l, &e);
        for j in 0..n {
            cov[[j, i]] = col[j];
        }
    }

    // Symmetrize away the rounding asymmetry
    for i in 0..n {
        for j in 0..i {
            let avg = 0.5 * (cov[[i, j]] + cov[[j, i]]);
            cov[[i, j]] = avg;
            cov[[j, i]] = avg;
        }
    }

    Ok(cov)
}

/// Calculate the correlation matrix from a covariance matrix.
///
/// `correl[i][j] = cov[i][j] / sqrt(cov[i][i] * cov[j][j])`; diagonal
/// entries are exactly 1.
pub fn correlation_from_covariance(cov: &Array2<f64>) -> Array2<f64> {
    let n = cov.nrows();
    let mut correl = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..n {
            if i == j {
                correl[[i, j]] = 1.0;
            } else {
                let denom = (cov[[i, i]] * cov[[j, j]]).sqrt();
                if denom > 0.0 {
                    correl[[i, j]] = cov[[i, j]] / denom;
                } else {
                    correl[[i, j]] = 0.0;
                }
            }
        }
    }

    correl
}

/// Extract standard errors (sqrt of the covariance diagonal).
pub fn standard_errors_from_covariance(cov: &Array2<f64>) -> Array1<f64> {
    let n = cov.nrows();
    let mut errors = Array1::zeros(n);

    for i in 0..n {
        errors[i] = if cov[[i, i]] > 0.0 {
            cov[[i, i]].sqrt()
        } else {
            0.0
        };
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    #[test]
    fn test_cholesky_round_trip() {
        let a = arr2(&[[4.0, 2.0], [2.0, 3.0]]);
        let l = cholesky_factor(&a).unwrap();

        // L * L^T must reproduce A
        let reconstructed = l.dot(&l.t());
        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(reconstructed[[i, j]], a[[i, j]], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let a = arr2(&[[1.0, 2.0], [2.0, 1.0]]);
        assert!(cholesky_factor(&a).is_none());
    }

    #[test]
    fn test_covariance_is_inverse() {
        let h = arr2(&[[4.0, 1.0], [1.0, 3.0]]);
        let cov = covariance_from_hessian(&h).unwrap();

        // H * cov should be the identity
        let prod = h.dot(&cov);
        assert_relative_eq!(prod[[0, 0]], 1.0, epsilon = 1e-10);
        assert_relative_eq!(prod[[0, 1]], 0.0, epsilon = 1e-10);
        assert_relative_eq!(prod[[1, 0]], 0.0, epsilon = 1e-10);
        assert_relative_eq!(prod[[1, 1]], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_singular_hessian() {
        let h = arr2(&[[1.0, 1.0], [1.0, 1.0]]);
        assert!(matches!(
            covariance_from_hessian(&h),
            Err(MlFitError::SingularMatrix)
        ));
    }

    #[test]
    fn test_correlation_matrix() {
        let cov = arr2(&[[0.1, 0.05], [0.05, 0.2]]);
        let correl = correlation_from_covariance(&cov);

        assert_eq!(correl[[0, 0]], 1.0);
        assert_eq!(correl[[1, 1]], 1.0);

        let expected = 0.05 / (0.1f64 * 0.2f64).sqrt();
        assert_relative_eq!(correl[[0, 1]], expected, epsilon = 1e-12);
        assert_relative_eq!(correl[[1, 0]], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_standard_errors() {
        let cov = arr2(&[[0.04, 0.0], [0.0, 0.25]]);
        let errors = standard_errors_from_covariance(&cov);
        assert_relative_eq!(errors[0], 0.2, epsilon = 1e-12);
        assert_relative_eq!(errors[1], 0.5, epsilon = 1e-12);
    }
}
