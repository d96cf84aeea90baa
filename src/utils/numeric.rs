//! Scalar numeric helpers: the error function and 1D quadrature.
//!
//! These are deliberately small, dependency-free routines. The error function
//! covers Gaussian range normalization; Simpson quadrature covers the density
//! shapes whose normalization has no convenient closed form.

/// Error function approximation.
///
/// From Abramowitz and Stegun, formula 7.1.26; absolute error below 1.5e-7,
/// which is far inside the quadrature and fit tolerances used elsewhere.
pub fn erf(x: f64) -> f64 {
    let x_abs = x.abs();
    let t = 1.0 / (1.0 + 0.3275911 * x_abs);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    let result = 1.0 - poly * (-x_abs * x_abs).exp();

    if x < 0.0 {
        -result
    } else {
        result
    }
}

/// Composite Simpson quadrature of `f` over `[a, b]` with `panels` panels.
///
/// `panels` is rounded up to the next even number. The integrand is assumed
/// finite on the whole interval.
pub fn simpson<F>(f: F, a: f64, b: f64, panels: usize) -> f64
where
    F: Fn(f64) -> f64,
{
    let n = if panels % 2 == 0 { panels } else { panels + 1 }.max(2);
    let h = (b - a) / n as f64;

    let mut sum = f(a) + f(b);
    for i in 1..n {
        let x = a + i as f64 * h;
        sum += if i % 2 == 0 { 2.0 } else { 4.0 } * f(x);
    }

    sum * h / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_erf_reference_values() {
        assert_relative_eq!(erf(0.0), 0.0, epsilon = 1e-7);
        assert_relative_eq!(erf(1.0), 0.8427008, epsilon = 1e-6);
        assert_relative_eq!(erf(2.0), 0.9953223, epsilon = 1e-6);
        assert_relative_eq!(erf(-1.0), -0.8427008, epsilon = 1e-6);

        // Saturates toward +/- 1
        assert!(erf(5.0) > 0.999999);
        assert!(erf(-5.0) < -0.999999);
    }

    #[test]
    fn test_simpson_polynomial() {
        // Simpson is exact for cubics
        let integral = simpson(|x| x * x * x, 0.0, 2.0, 16);
        assert_relative_eq!(integral, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_simpson_gaussian() {
        // Standard normal over [-8, 8] integrates to ~1
        let norm = 1.0 / (2.0 * std::f64::consts::PI).sqrt();
        let integral = simpson(|x| norm * (-0.5 * x * x).exp(), -8.0, 8.0, 1024);
        assert_relative_eq!(integral, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_simpson_odd_panel_count() {
        // Odd panel counts are rounded up, not mis-weighted
        let a = simpson(|x| x * x, 0.0, 1.0, 15);
        let b = simpson(|x| x * x, 0.0, 1.0, 16);
        assert_relative_eq!(a, b, epsilon = 1e-12);
    }
}
