//! Sampling and normalization properties of the density catalog.

use approx::assert_relative_eq;
use mlfit_rs::density::{self, Density, Product, Sum};
use mlfit_rs::parameters::{Parameter, Parameters};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn mbc_params() -> Parameters {
    let mut params = Parameters::new();
    params.add_param_with_bounds("mbc", 5.2, 5.1, 5.3).unwrap();
    params.add(Parameter::constant("mB0", 5.280));
    params
        .add_param_with_bounds("gB0", 0.007, 0.001, 0.02)
        .unwrap();
    params
}

#[test]
fn gaussian_integral_normalization_sanity() {
    // A Gaussian whose mean is inside a range wide compared to its width
    // integrates to ~1 over that range
    let params = mbc_params();
    let model = density::gaussian("mbc", "mB0", "gB0");

    let integral = model.integral(&params, "mbc", 5.1, 5.3).unwrap();
    assert_relative_eq!(integral, 1.0, max_relative = 1e-2);

    // Half the range on either side of the mean is about half the mass...
    let lower = model.integral(&params, "mbc", 5.1, 5.28).unwrap();
    let upper = model.integral(&params, "mbc", 5.28, 5.3).unwrap();
    // ...and the two halves add up to the whole
    assert_relative_eq!(lower + upper, integral, max_relative = 1e-9);
}

#[test]
fn fixed_mean_gaussian_toy_generation() {
    // mB0 = 5.280 fixed, Gaussian over [5.1, 5.3], n = 1000:
    // exactly 1000 points, all inside the declared range
    let params = mbc_params();
    let model = density::gaussian("mbc", "mB0", "gB0");

    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let data = mlfit_rs::Dataset::generate(&model, &params, 1000, &mut rng).unwrap();

    assert_eq!(data.len(), 1000);
    for &x in data.column("mbc").unwrap().iter() {
        assert!((5.1..=5.3).contains(&x), "sampled {} outside range", x);
    }
}

#[test]
fn gaussian_sample_moments_converge() {
    // Empirical mean and width approach the true values at the 1/sqrt(N)
    // rate; assert within 5 standard errors of the expected spread. The mean
    // sits at the center of the range so truncation cannot bias the moments.
    let mut params = Parameters::new();
    params.add_param_with_bounds("mbc", 5.2, 5.1, 5.3).unwrap();
    params.add(Parameter::constant("mB0", 5.2));
    params
        .add_param_with_bounds("gB0", 0.007, 0.001, 0.02)
        .unwrap();
    let model = density::gaussian("mbc", "mB0", "gB0");

    let n = 100_000usize;
    let sigma = 0.007;
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let data = model.sample(&params, n, &mut rng).unwrap();

    let mean = data.mean("mbc").unwrap();
    let mean_tolerance = 5.0 * sigma / (n as f64).sqrt();
    assert!(
        (mean - 5.2).abs() < mean_tolerance,
        "sample mean {} deviates from 5.2 by more than {}",
        mean,
        mean_tolerance
    );

    let width = data.variance("mbc").unwrap().sqrt();
    let width_tolerance = 5.0 * sigma / (2.0 * n as f64).sqrt();
    assert!(
        (width - sigma).abs() < width_tolerance,
        "sample width {} deviates from {} by more than {}",
        width,
        sigma,
        width_tolerance
    );
}

#[test]
fn sum_fraction_sampling_follows_mixture() {
    // A 70/30 mixture of a narrow peak and a flat-ish background: the share
    // of events near the peak tracks the fraction
    let mut params = mbc_params();
    params
        .add_param_with_bounds("crv", -5.0, -80.0, -1.0)
        .unwrap();
    params.add_param_with_bounds("fsb", 0.7, 0.0, 1.0).unwrap();

    let model: Density = Sum::with_fractions(
        vec![
            density::gaussian("mbc", "mB0", "gB0"),
            density::exponential("mbc", "crv"),
        ],
        &["fsb"],
    )
    .unwrap()
    .into();

    let n = 20_000usize;
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let data = model.sample(&params, n, &mut rng).unwrap();
    assert_eq!(data.len(), n);

    // Count events within +/- 3 sigma of the peak. The signal puts ~99.7%
    // of its events there; the background contributes a sliver.
    let lo = 5.280 - 3.0 * 0.007;
    let hi = 5.280 + 3.0 * 0.007;
    let near_peak = data
        .column("mbc")
        .unwrap()
        .iter()
        .filter(|&&x| x >= lo && x <= hi)
        .count() as f64;

    let signal_share = near_peak / n as f64;
    assert!(
        signal_share > 0.65 && signal_share < 0.80,
        "peak-region share {} not consistent with fsb = 0.7",
        signal_share
    );
}

#[test]
fn product_samples_factorize() {
    let mut params = Parameters::new();
    params.add_param_with_bounds("x", 0.0, -1.0, 1.0).unwrap();
    params.add_param_with_bounds("y", 0.0, -1.0, 1.0).unwrap();
    params.add(Parameter::constant("mx", 0.0));
    params.add_param_with_bounds("wx", 0.1, 0.001, 0.5).unwrap();
    params.add_param_with_bounds("ky", -2.0, -5.0, -0.1).unwrap();

    let model: Density = Product::new(vec![
        density::gaussian("x", "mx", "wx"),
        density::exponential("y", "ky"),
    ])
    .unwrap()
    .into();

    let mut rng = ChaCha8Rng::seed_from_u64(12);
    let data = model.sample(&params, 50_000, &mut rng).unwrap();

    // x follows the Gaussian factor
    assert!((data.mean("x").unwrap()).abs() < 0.005);
    let wx = data.variance("x").unwrap().sqrt();
    assert!((wx - 0.1).abs() < 0.005, "x width {}", wx);

    // y leans toward the low edge under the falling exponential
    assert!(data.mean("y").unwrap() < -0.1);

    // Independence: the sample correlation between x and y is tiny
    let xs = data.column("x").unwrap();
    let ys = data.column("y").unwrap();
    let mx = xs.sum() / xs.len() as f64;
    let my = ys.sum() / ys.len() as f64;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        cov += (x - mx) * (y - my);
        vx += (x - mx) * (x - mx);
        vy += (y - my) * (y - my);
    }
    let corr = cov / (vx * vy).sqrt();
    assert!(corr.abs() < 0.02, "x-y correlation {}", corr);
}

#[test]
fn argus_samples_respect_cutoff() {
    let mut params = Parameters::new();
    params.add_param_with_bounds("mbc", 5.25, 5.2, 5.29).unwrap();
    params.add(Parameter::constant("mCt", 5.29));
    params
        .add_param_with_bounds("crv", -20.0, -80.0, -1.0)
        .unwrap();

    let model = density::argus("mbc", "mCt", "crv");
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let data = model.sample(&params, 5000, &mut rng).unwrap();

    for &x in data.column("mbc").unwrap().iter() {
        assert!(x < 5.29, "ARGUS sample {} at or beyond the cutoff", x);
    }
}

#[test]
fn projection_matches_histogram() {
    // The projected curve should track a high-statistics histogram
    let params = mbc_params();
    let model = density::gaussian("mbc", "mB0", "gB0");

    let n = 200_000usize;
    let mut rng = ChaCha8Rng::seed_from_u64(23);
    let data = model.sample(&params, n, &mut rng).unwrap();

    let curve = model.project(&params, "mbc", 100).unwrap();

    // Compare the density at the peak with the binned estimate there
    let bins = 100usize;
    let width = 0.2 / bins as f64;
    let peak_bin_lo = 5.280 - width / 2.0;
    let count = data
        .column("mbc")
        .unwrap()
        .iter()
        .filter(|&&x| x >= peak_bin_lo && x < peak_bin_lo + width)
        .count() as f64;
    let empirical_density = count / (n as f64 * width);

    let peak_curve = curve
        .points
        .iter()
        .map(|&(_, y)| y)
        .fold(f64::NEG_INFINITY, f64::max);

    assert_relative_eq!(peak_curve, empirical_density, max_relative = 0.05);
}
