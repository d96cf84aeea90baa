//! Finite difference methods for numerical differentiation.
//!
//! The minimizer needs the gradient and Hessian of a scalar objective (the
//! negative log-likelihood) with respect to the internal parameter vector.
//! Both are computed with central differences, with the step adapted to each
//! coordinate's scale.

use crate::error::Result;
use ndarray::{Array1, Array2};

/// Default step size for finite differences.
const DEFAULT_EPSILON: f64 = 1e-5;

fn scaled_step(value: f64, eps: f64) -> f64 {
    if value.abs() > eps {
        value.abs() * eps
    } else {
        eps
    }
}

/// Compute the gradient of a scalar function using central finite differences.
///
/// `grad[j] = df/dx[j]` at `x`.
pub fn gradient<F>(f: F, x: &Array1<f64>, epsilon: Option<f64>) -> Result<Array1<f64>>
where
    F: Fn(&Array1<f64>) -> Result<f64>,
{
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    let n = x.len();

    let mut grad = Array1::zeros(n);

    for j in 0..n {
        let eps_j = scaled_step(x[j], eps);

        let mut x_forward = x.clone();
        x_forward[j] += eps_j;

        let mut x_backward = x.clone();
        x_backward[j] -= eps_j;

        let f_forward = f(&x_forward)?;
        let f_backward = f(&x_backward)?;

        grad[j] = (f_forward - f_backward) / (2.0 * eps_j);
    }

    Ok(grad)
}

/// Compute the Hessian of a scalar function using central finite differences.
///
/// `hess[i][j] = d2f/dx[i]dx[j]` at `x`. Only the lower triangle is computed;
/// the upper triangle is filled by symmetry.
pub fn hessian<F>(f: F, x: &Array1<f64>, epsilon: Option<f64>) -> Result<Array2<f64>>
where
    F: Fn(&Array1<f64>) -> Result<f64>,
{
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    let n = x.len();

    let mut hess = Array2::zeros((n, n));
    let f0 = f(x)?;

    for i in 0..n {
        for j in 0..=i {
            let eps_i = scaled_step(x[i], eps);
            let eps_j = scaled_step(x[j], eps);

            if i == j {
                let mut x_p = x.clone();
                let mut x_m = x.clone();
                x_p[i] += eps_i;
                x_m[i] -= eps_i;

                let f_p = f(&x_p)?;
                let f_m = f(&x_m)?;

                hess[[i, i]] = (f_p - 2.0 * f0 + f_m) / (eps_i * eps_i);
            } else {
                let mut x_pp = x.clone();
                let mut x_pm = x.clone();
                let mut x_mp = x.clone();
                let mut x_mm = x.clone();

                x_pp[i] += eps_i;
                x_pp[j] += eps_j;

                x_pm[i] += eps_i;
                x_pm[j] -= eps_j;

                x_mp[i] -= eps_i;
                x_mp[j] += eps_j;

                x_mm[i] -= eps_i;
                x_mm[j] -= eps_j;

                let f_pp = f(&x_pp)?;
                let f_pm = f(&x_pm)?;
                let f_mp = f(&x_mp)?;
                let f_mm = f(&x_mm)?;

                hess[[i, j]] = (f_pp - f_pm - f_mp + f_mm) / (4.0 * eps_i * eps_j);
                hess[[j, i]] = hess[[i, j]];
            }
        }
    }

    Ok(hess)
}
