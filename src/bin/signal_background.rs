//! Fit of a signal peak over phase-space background.
//!
//! A Crystal Ball signal plus an ARGUS background, combined by a signal
//! fraction and fitted to a CSV dataset. If the dataset file is missing, a
//! toy sample is generated from the truth model and written out first, so
//! the load path is always exercised.

use mlfit_rs::dataset::{Dataset, RowPolicy};
use mlfit_rs::density::{self, Density, Sum};
use mlfit_rs::fit::{FitConfig, Fitter};
use mlfit_rs::parameters::{Parameter, Parameters};
use mlfit_rs::plot::{Binning, PlotColor, PlotRenderer, RenderMode};
use mlfit_rs::{MlFitError, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::Path;

const DATA_FILE: &str = "fitme-1b.csv";
const N_EVENTS: usize = 10_000;

fn main() {
    if let Err(e) = run() {
        eprintln!("signal-background failed: {}", e);
        std::process::exit(1);
    }
}

fn build_parameters() -> Result<Parameters> {
    let mut params = Parameters::new();
    params.add_param_with_bounds("mbc", 5.25, 5.2, 5.29)?;
    params.get_mut("mbc").unwrap().label = "m_{BC}".to_string();
    params.get_mut("mbc").unwrap().unit = Some("GeV/c^2".to_string());

    // Signal shape
    params.add(
        Parameter::with_bounds("mB0", 5.280, 5.1, 5.3)?
            .with_label("m_{B^0}")
            .with_unit("GeV/c^2"),
    );
    params.add(
        Parameter::with_bounds("gB0", 0.003, 0.0001, 0.015)?
            .with_label("#Gamma_{B^0}")
            .with_unit("GeV/c^2"),
    );
    params.add(Parameter::with_bounds("alp", 1.3, 0.1, 5.0)?.with_label("#alpha_{CB}"));
    params.add(Parameter::constant("ncb", 15.0).with_label("n_{CB}"));

    // Background shape
    params.add(
        Parameter::with_bounds("mCt", 5.29, 5.2, 5.3)?
            .with_label("m_{cutoff}")
            .with_unit("GeV/c^2"),
    );
    params.add(Parameter::with_bounds("crv", -20.0, -80.0, -1.0)?.with_label("c_{curvature}"));

    // Signal fraction
    params.add(Parameter::with_bounds("fsb", 0.7, 0.0, 1.0)?.with_label("n_s/(n_s+n_b)"));

    Ok(params)
}

fn build_model() -> Result<(Density, Density, Density)> {
    let sig = density::crystal_ball("mbc", "mB0", "gB0", "alp", "ncb");
    let bkg = density::argus("mbc", "mCt", "crv");
    let pdf: Density = Sum::with_fractions(vec![sig.clone(), bkg.clone()], &["fsb"])?.into();
    Ok((sig, bkg, pdf))
}

fn run() -> Result<()> {
    let mut params = build_parameters()?;
    let (sig, bkg, pdf) = build_model()?;

    // Materialize a toy sample on the first run, then always load from CSV
    if !Path::new(DATA_FILE).exists() {
        let mut rng = ChaCha8Rng::seed_from_u64(58);
        let toys = pdf.sample(&params, N_EVENTS, &mut rng)?;
        toys.to_csv(DATA_FILE)?;
        println!("wrote {} toy events to {}", toys.len(), DATA_FILE);
    }

    let dataset = Dataset::from_csv(DATA_FILE, &params, &["mbc"], RowPolicy::Strict)?;
    println!("loaded {} events from {}", dataset.len(), DATA_FILE);

    let renderer = PlotRenderer::new(RenderMode::Batch);
    let binning = Binning::new(45, 5.2, 5.29)?;
    let n = dataset.len() as f64;

    // Always draw the data first; it saves a lot of debugging time
    let mut data_plot = renderer.frame(&params, "mbc")?;
    data_plot.set_title("Plot of the data only");
    renderer.draw_dataset(&mut data_plot, &dataset, binning)?;
    renderer.save(&data_plot, "data-1b.svg")?;

    // Pre-fit components and combined model
    let fsb = params.value_of("fsb")?;
    let mut prefit = renderer.frame(&params, "mbc")?;
    prefit.set_title("A plot without fit for debugging");
    renderer.draw_dataset(&mut prefit, &dataset, binning)?;
    renderer.draw_density(&mut prefit, &sig, &params, PlotColor::Green, Some(n * fsb))?;
    renderer.draw_density(
        &mut prefit,
        &bkg,
        &params,
        PlotColor::Blue,
        Some(n * (1.0 - fsb)),
    )?;
    renderer.draw_density(&mut prefit, &pdf, &params, PlotColor::Red, Some(n))?;
    renderer.save(&prefit, "pre-fit-1b.svg")?;

    // Run the fit with the careful strategy
    let mut fitter = Fitter::with_config(FitConfig::new().with_strategy(2));
    let result = fitter.fit(&pdf, &dataset, &mut params, false)?;
    println!("{}", result);
    if !result.converged {
        return Err(MlFitError::ConvergenceFailure(format!(
            "fit did not converge (status code {})",
            result.status.code()
        )));
    }

    // Post-fit plot with per-component curves
    let fsb = params.value_of("fsb")?;
    let mut postfit = renderer.frame(&params, "mbc")?;
    postfit.set_title("Fitted distribution");
    renderer.draw_dataset(&mut postfit, &dataset, binning)?;
    renderer.draw_density(&mut postfit, &sig, &params, PlotColor::Green, Some(n * fsb))?;
    renderer.draw_density(
        &mut postfit,
        &bkg,
        &params,
        PlotColor::Blue,
        Some(n * (1.0 - fsb)),
    )?;
    renderer.draw_density(&mut postfit, &pdf, &params, PlotColor::Red, Some(n))?;
    renderer.save(&postfit, "post-fit-1b.svg")?;

    // Access the fitted values in code
    println!("floated parameters:");
    for snapshot in &result.parameters {
        println!(
            "  {} = {:.5} +/- {:.5}",
            snapshot.name,
            snapshot.value,
            snapshot.stderr.unwrap_or(f64::NAN)
        );
    }

    println!("correlations:");
    let names: Vec<&str> = result.parameters.iter().map(|p| p.name.as_str()).collect();
    for (i, a) in names.iter().enumerate() {
        for b in names.iter().skip(i + 1) {
            println!(
                "  corr({}, {}) = {:.3}",
                a,
                b,
                result.correlation_between(a, b).unwrap_or(f64::NAN)
            );
        }
    }

    std::fs::write(
        "fit-result-1b.json",
        serde_json::to_string_pretty(&result.to_json())?,
    )?;
    println!("wrote post-fit-1b.svg and fit-result-1b.json");
    Ok(())
}
