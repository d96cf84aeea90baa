//! A very simple 1D toy fit of a beam-constrained mass peak.
//!
//! Declares an observable and a Gaussian model over it, looks at the model,
//! generates a toy dataset, looks at the data, fits, and looks again. Every
//! stage is saved as an SVG document.

use mlfit_rs::density;
use mlfit_rs::fit::Fitter;
use mlfit_rs::parameters::{Parameter, Parameters};
use mlfit_rs::plot::{Binning, PlotColor, PlotRenderer, RenderMode};
use mlfit_rs::{MlFitError, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn main() {
    if let Err(e) = run() {
        eprintln!("toy-gaussian failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // The observable and the model parameters
    let mut params = Parameters::new();
    params.add_param_with_bounds("mbc", 5.2, 5.1, 5.3)?;
    params.get_mut("mbc").unwrap().label = "m_{BC}".to_string();
    params.get_mut("mbc").unwrap().unit = Some("GeV/c^2".to_string());

    // The B0 mass is known; only the width floats
    params.add(
        Parameter::constant("mB0", 5.280)
            .with_label("m_{B^0}")
            .with_unit("GeV/c^2"),
    );
    params.add(
        Parameter::with_bounds("gB0", 0.007, 0.0, 0.01)?
            .with_label("#Gamma_{B^0}")
            .with_unit("GeV/c^2"),
    );

    let renderer = PlotRenderer::new(RenderMode::Batch);

    // Draw the (empty) axes first
    let mut plot = renderer.frame(&params, "mbc")?;
    renderer.save(&plot, "empty-axes-1a.svg")?;

    // Always plot the model and look at it before fitting
    let model = density::gaussian("mbc", "mB0", "gB0");
    renderer.draw_density(&mut plot, &model, &params, PlotColor::Blue, None)?;
    plot.set_title("Overly simplistic model");
    renderer.save(&plot, "simple-model-1a.svg")?;

    // Generate a toy MC dataset
    let mut rng = ChaCha8Rng::seed_from_u64(20170217);
    let dataset = model.sample(&params, 1000, &mut rng)?;
    println!(
        "generated {} toy events, mean = {:.4}",
        dataset.len(),
        dataset.mean("mbc").unwrap_or(f64::NAN)
    );

    // Always plot the data and look at it before fitting
    let binning = Binning::new(50, 5.1, 5.3)?;
    let mut data_plot = renderer.frame(&params, "mbc")?;
    data_plot.set_title("Toy data with the model from which it was generated");
    renderer.draw_dataset(&mut data_plot, &dataset, binning)?;
    renderer.save(&data_plot, "toy-data-1a.svg")?;

    // Overlay the pre-fit model, scaled to the binned counts
    let mut prefit = renderer.frame(&params, "mbc")?;
    prefit.set_title("Model and toy data before the fit");
    renderer.draw_dataset(&mut prefit, &dataset, binning)?;
    renderer.draw_density(
        &mut prefit,
        &model,
        &params,
        PlotColor::Blue,
        Some(dataset.len() as f64),
    )?;
    renderer.save(&prefit, "pre-fit-1a.svg")?;

    // Perform the fit
    let mut fitter = Fitter::new();
    let result = fitter.fit(&model, &dataset, &mut params, false)?;
    println!("{}", result);
    if !result.converged {
        return Err(MlFitError::ConvergenceFailure(format!(
            "fit did not converge (status code {})",
            result.status.code()
        )));
    }

    let mut postfit = renderer.frame(&params, "mbc")?;
    postfit.set_title("Toy data with the fitted model");
    renderer.draw_dataset(&mut postfit, &dataset, binning)?;
    renderer.draw_density(
        &mut postfit,
        &model,
        &params,
        PlotColor::Red,
        Some(dataset.len() as f64),
    )?;
    renderer.save(&postfit, "post-fit-1a.svg")?;

    std::fs::write(
        "fit-result-1a.json",
        serde_json::to_string_pretty(&result.to_json())?,
    )?;
    println!("wrote post-fit-1a.svg and fit-result-1a.json");
    Ok(())
}
