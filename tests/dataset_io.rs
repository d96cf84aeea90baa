//! Dataset loading: CSV round trips and the malformed-row policies.

use mlfit_rs::dataset::{Dataset, RowPolicy};
use mlfit_rs::density;
use mlfit_rs::parameters::{Parameter, Parameters};
use mlfit_rs::MlFitError;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::io::Write;
use std::path::PathBuf;

fn mbc_params() -> Parameters {
    let mut params = Parameters::new();
    params.add_param_with_bounds("mbc", 5.2, 5.1, 5.3).unwrap();
    params.add(Parameter::constant("mB0", 5.28));
    params
        .add_param_with_bounds("gB0", 0.007, 0.001, 0.02)
        .unwrap();
    params
}

fn temp_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(name)
}

#[test]
fn generated_toys_survive_a_csv_round_trip() {
    let params = mbc_params();
    let model = density::gaussian("mbc", "mB0", "gB0");

    let mut rng = ChaCha8Rng::seed_from_u64(55);
    let toys = model.sample(&params, 2000, &mut rng).unwrap();

    let path = temp_file("mlfit_it_round_trip.csv");
    toys.to_csv(&path).unwrap();
    let loaded = Dataset::from_csv(&path, &params, &["mbc"], RowPolicy::Strict).unwrap();

    assert_eq!(loaded.len(), toys.len());
    assert_eq!(loaded.skipped(), 0);

    // Statistics survive the text round trip
    let before = toys.mean("mbc").unwrap();
    let after = loaded.mean("mbc").unwrap();
    assert!((before - after).abs() < 1e-9);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn strict_policy_fails_fast_with_line_context() {
    let params = mbc_params();
    let path = temp_file("mlfit_it_strict.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "mbc").unwrap();
    writeln!(file, "5.15").unwrap();
    writeln!(file, "garbage").unwrap();
    writeln!(file, "5.25").unwrap();
    drop(file);

    match Dataset::from_csv(&path, &params, &["mbc"], RowPolicy::Strict) {
        Err(MlFitError::MalformedRecord(msg)) => {
            assert!(msg.contains("row 3"), "message lacks row context: {}", msg);
        }
        other => panic!("expected MalformedRecord, got {:?}", other.map(|d| d.len())),
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn lenient_policy_skips_bad_and_out_of_bounds_rows() {
    let params = mbc_params();
    let path = temp_file("mlfit_it_lenient.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "mbc,extra").unwrap();
    writeln!(file, "5.15,1").unwrap();
    writeln!(file, "oops,2").unwrap(); // non-numeric
    writeln!(file, "5.45,3").unwrap(); // out of bounds
    writeln!(file, "5.25,4").unwrap();
    drop(file);

    let data = Dataset::from_csv(&path, &params, &["mbc"], RowPolicy::Lenient).unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data.skipped(), 2);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn extra_columns_are_ignored_and_order_is_free() {
    let params = {
        let mut p = Parameters::new();
        p.add_param_with_bounds("x", 0.0, -1.0, 1.0).unwrap();
        p.add_param_with_bounds("y", 0.0, -1.0, 1.0).unwrap();
        p
    };

    let path = temp_file("mlfit_it_columns.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "run,y,x").unwrap();
    writeln!(file, "1,0.5,-0.25").unwrap();
    writeln!(file, "2,-0.75,0.5").unwrap();
    drop(file);

    let data = Dataset::from_csv(&path, &params, &["x", "y"], RowPolicy::Strict).unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data.column("x").unwrap()[0], -0.25);
    assert_eq!(data.column("y").unwrap()[1], -0.75);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn unregistered_variable_is_rejected() {
    let params = mbc_params();
    let path = temp_file("mlfit_it_unregistered.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "mystery").unwrap();
    writeln!(file, "1.0").unwrap();
    drop(file);

    let result = Dataset::from_csv(&path, &params, &["mystery"], RowPolicy::Strict);
    assert!(matches!(result, Err(MlFitError::ParameterNotFound(_))));

    let _ = std::fs::remove_file(&path);
}
