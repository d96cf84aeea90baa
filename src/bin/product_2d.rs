//! Multidimensional fitting and data visualization.
//!
//! A 2D density built as the product of a Gaussian in x and an exponential
//! in y, sampled into a large toy dataset, fitted, and inspected through its
//! one-dimensional projections.

use mlfit_rs::density::{self, Density, Product};
use mlfit_rs::fit::Fitter;
use mlfit_rs::parameters::{Parameter, Parameters};
use mlfit_rs::plot::{Binning, PlotColor, PlotRenderer, RenderMode};
use mlfit_rs::{MlFitError, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

fn main() {
    if let Err(e) = run() {
        eprintln!("product-2d failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Independent variables
    let mut params = Parameters::new();
    params.add_param_with_bounds("x", 0.0, -1.0, 1.0)?;
    params.add_param_with_bounds("y", 0.0, -1.0, 1.0)?;

    // Model in x
    params.add(Parameter::with_bounds("wx", 0.1, 0.001, 0.5)?.with_label("#sigma_{x}"));
    params.add(Parameter::constant("mx", 0.0).with_label("#mu_{x}"));

    // Model in y
    params.add(Parameter::with_bounds("ky", -2.0, -5.0, -0.1)?.with_label("k_{y}"));

    let gsx = density::gaussian("x", "mx", "wx");
    let exy = density::exponential("y", "ky");
    let pdf: Density = Product::new(vec![gsx, exy])?.into();

    let renderer = PlotRenderer::new(RenderMode::Batch);

    // Model projections before any data
    for (obs, tag) in [("x", "model-x-proj-2.svg"), ("y", "model-y-proj-2.svg")] {
        let mut plot = renderer.frame(&params, obs)?;
        plot.set_title(&format!("Model projection in {}", obs));
        renderer.draw_density(&mut plot, &pdf, &params, PlotColor::Blue, None)?;
        renderer.save(&plot, tag)?;
    }

    // Generate some data
    let start = Instant::now();
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let toydata = pdf.sample(&params, 100_000, &mut rng)?;
    println!(
        "generated {} events in {:.2} s",
        toydata.len(),
        start.elapsed().as_secs_f64()
    );

    // Fit from displaced starting values
    params.set_value("wx", 0.3)?;
    params.set_value("ky", -1.0)?;

    let mut fitter = Fitter::new();
    let result = fitter.fit(&pdf, &toydata, &mut params, false)?;
    println!("{}", result);
    if !result.converged {
        return Err(MlFitError::ConvergenceFailure(format!(
            "fit did not converge (status code {})",
            result.status.code()
        )));
    }

    // Check the fitted projections against the data
    let binning = Binning::new(50, -1.0, 1.0)?;
    for (obs, tag) in [
        ("x", "post-fit-x-proj-2.svg"),
        ("y", "post-fit-y-proj-2.svg"),
    ] {
        let mut plot = renderer.frame(&params, obs)?;
        plot.set_title(&format!("Fitted projection in {}", obs));
        renderer.draw_dataset(&mut plot, &toydata, binning)?;
        renderer.draw_density(
            &mut plot,
            &pdf,
            &params,
            PlotColor::Red,
            Some(toydata.len() as f64),
        )?;
        renderer.save(&plot, tag)?;
    }

    std::fs::write(
        "fit-result-2.json",
        serde_json::to_string_pretty(&result.to_json())?,
    )?;
    println!("wrote projection plots and fit-result-2.json");
    Ok(())
}
