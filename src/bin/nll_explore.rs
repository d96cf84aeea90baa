//! Running the minimization interactively and getting hold of the NLL.
//!
//! Builds an extended signal-plus-background model, creates the raw NLL
//! objective, walks the minimizer one inspectable step at a time, computes
//! the error matrix separately, and plots the NLL as a function of the
//! signal yield around the minimum.

use mlfit_rs::dataset::{Dataset, RowPolicy};
use mlfit_rs::density::{self, Density, Sum};
use mlfit_rs::fit::{FitConfig, Fitter};
use mlfit_rs::parameters::{Parameter, Parameters};
use mlfit_rs::plot::{PlotColor, PlotRenderer, RenderMode};
use mlfit_rs::{MlFitError, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::Path;

const DATA_FILE: &str = "fitme-1b.csv";
const N_EVENTS: usize = 10_000;
const MAX_MANUAL_STEPS: usize = 200;

fn main() {
    if let Err(e) = run() {
        eprintln!("nll-explore failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // A copy of the signal-plus-background model, with yields instead of a
    // fraction: the total event count is itself part of the likelihood
    let mut params = Parameters::new();
    params.add_param_with_bounds("mbc", 5.25, 5.2, 5.29)?;
    params.get_mut("mbc").unwrap().label = "m_{BC}".to_string();
    params.get_mut("mbc").unwrap().unit = Some("GeV/c^2".to_string());

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
    params.add(
        Parameter::with_bounds("mCt", 5.29, 5.2, 5.3)?
            .with_label("m_{cutoff}")
            .with_unit("GeV/c^2"),
    );
    params.add(Parameter::with_bounds("crv", -20.0, -80.0, -1.0)?.with_label("c_{curvature}"));
    params.add(Parameter::with_bounds("nsg", 7000.0, 10.0, 10_000.0)?.with_label("n_{s}"));
    params.add(Parameter::with_bounds("nbg", 3000.0, 10.0, 10_000.0)?.with_label("n_{b}"));

    let sig = density::crystal_ball("mbc", "mB0", "gB0", "alp", "ncb");
    let bkg = density::argus("mbc", "mCt", "crv");
    let pdf: Density = Sum::extended(vec![sig, bkg], &["nsg", "nbg"])?.into();

    // Share the dataset with the signal-background exercise
    if !Path::new(DATA_FILE).exists() {
        let mut rng = ChaCha8Rng::seed_from_u64(58);
        let toys = pdf.sample(&params, N_EVENTS, &mut rng)?;
        toys.to_csv(DATA_FILE)?;
        println!("wrote {} toy events to {}", toys.len(), DATA_FILE);
    }
    let dataset = Dataset::from_csv(DATA_FILE, &params, &["mbc"], RowPolicy::Strict)?;
    println!("loaded {} events from {}", dataset.len(), DATA_FILE);

    // Create the NLL and minimize it by hand, one step at a time
    let mut fitter = Fitter::with_config(FitConfig::new().with_strategy(2));
    let nll = fitter.create_nll(&pdf, &dataset, true)?;
    println!("starting NLL = {:.3}", nll.value(&params)?);

    let mut steps = 0;
    loop {
        let outcome = fitter.step(&nll, &mut params)?;
        steps += 1;
        println!(
            "step {:3}: nll = {:.3}, |grad| = {:.3e}, accepted = {}",
            steps, outcome.nll, outcome.gradient_norm, outcome.accepted
        );

        if outcome.converged {
            println!("gradient below tolerance after {} steps", steps);
            break;
        }
        if !outcome.accepted {
            return Err(MlFitError::ConvergenceFailure(
                "minimizer stalled before convergence".to_string(),
            ));
        }
        if steps >= MAX_MANUAL_STEPS {
            return Err(MlFitError::ConvergenceFailure(format!(
                "no convergence within {} manual steps",
                MAX_MANUAL_STEPS
            )));
        }
    }

    // Now compute the error matrix at the minimum
    let result = fitter.compute_errors(&nll, &mut params)?;
    println!("{}", result);
    if !result.converged {
        return Err(MlFitError::ConvergenceFailure(format!(
            "error computation failed (status code {})",
            result.status.code()
        )));
    }

    // Plot the NLL as a function of the signal yield at the minimum
    let renderer = PlotRenderer::new(RenderMode::Batch);
    let scan = nll.scan(&params, "nsg", 10.0, 10_000.0, 120)?;
    let mut plot = renderer.frame(&params, "nsg")?;
    plot.set_title("NLL vs signal yield");
    renderer.draw_curve(&mut plot, &scan, PlotColor::Blue);
    renderer.save(&plot, "nll-scan-3.svg")?;

    std::fs::write(
        "fit-result-3.json",
        serde_json::to_string_pretty(&result.to_json())?,
    )?;
    println!("wrote nll-scan-3.svg and fit-result-3.json");
    Ok(())
}
