//! Datasets: ordered collections of observed points over named variables.
//!
//! A dataset is immutable once built. It is either generated from a density
//! (toy Monte Carlo) or loaded from a CSV store, with every row validated
//! against the declared bounds of its variables. Malformed rows are handled
//! per a caller-chosen policy: strict loading fails fast, lenient loading
//! skips bad rows and counts them.

use crate::density::{Density, Point};
use crate::error::{MlFitError, Result};
use crate::parameters::Parameters;
use ndarray::Array1;
use rand::Rng;
use std::path::Path;

/// How `from_csv` reacts to a malformed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPolicy {
    /// Fail fast on the first malformed row.
    Strict,

    /// Skip malformed rows and count them; see [`Dataset::skipped`].
    Lenient,
}

/// An immutable set of points over named variables.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Variable names, fixing the column order of `rows`.
    variables: Vec<String>,

    /// One value per variable, per point.
    rows: Vec<Vec<f64>>,

    /// Declared (min, max) of each variable at build time.
    ranges: Vec<(f64, f64)>,

    /// Rows dropped by lenient loading.
    skipped: usize,
}

impl Dataset {
    /// Build a dataset from raw rows, validating every value against the
    /// variables' declared bounds.
    ///
    /// Every variable must be registered; every row must have one value per
    /// variable, inside that variable's bounds.
    pub fn from_rows(
        variables: Vec<String>,
        rows: Vec<Vec<f64>>,
        params: &Parameters,
    ) -> Result<Self> {
        let ranges = declared_ranges(&variables, params)?;

        for (i, row) in rows.iter().enumerate() {
            validate_row(row, &variables, &ranges)
                .map_err(|e| MlFitError::MalformedRecord(format!("row {}: {}", i, e)))?;
        }

        Ok(Self {
            variables,
            rows,
            ranges,
            skipped: 0,
        })
    }

    /// Generate a toy dataset by sampling `n` points from a density.
    pub fn generate<R: Rng + ?Sized>(
        density: &Density,
        params: &Parameters,
        n: usize,
        rng: &mut R,
    ) -> Result<Self> {
        density.sample(params, n, rng)
    }

    /// Load a dataset from a CSV file.
    ///
    /// The file must carry a header naming at least the requested variables;
    /// extra columns are ignored. Schema problems (missing columns) always
    /// fail; malformed rows follow `policy`.
    pub fn from_csv<P: AsRef<Path>>(
        path: P,
        params: &Parameters,
        variables: &[&str],
        policy: RowPolicy,
    ) -> Result<Self> {
        let variables: Vec<String> = variables.iter().map(|s| s.to_string()).collect();
        let ranges = declared_ranges(&variables, params)?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path.as_ref())?;

        // Resolve each variable to its column index up front
        let headers = reader.headers()?.clone();
        let mut indices = Vec::with_capacity(variables.len());
        for var in &variables {
            let idx = headers.iter().position(|h| h == var).ok_or_else(|| {
                MlFitError::MalformedRecord(format!(
                    "CSV '{}' has no column '{}'",
                    path.as_ref().display(),
                    var
                ))
            })?;
            indices.push(idx);
        }

        let mut rows = Vec::new();
        let mut skipped = 0usize;
        for (line, record) in reader.records().enumerate() {
            let record = record?;

            let parsed: std::result::Result<Vec<f64>, String> = indices
                .iter()
                .map(|&idx| {
                    record
                        .get(idx)
                        .ok_or_else(|| "short row".to_string())
                        .and_then(|field| {
                            field
                                .parse::<f64>()
                                .map_err(|_| format!("non-numeric field '{}'", field))
                        })
                })
                .collect();

            let row = match parsed {
                Ok(row) => row,
                Err(msg) => match policy {
                    RowPolicy::Strict => {
                        return Err(MlFitError::MalformedRecord(format!(
                            "row {}: {}",
                            line + 2,
                            msg
                        )))
                    }
                    RowPolicy::Lenient => {
                        skipped += 1;
                        continue;
                    }
                },
            };

            if let Err(msg) = validate_row(&row, &variables, &ranges) {
                match policy {
                    RowPolicy::Strict => {
                        return Err(MlFitError::MalformedRecord(format!(
                            "row {}: {}",
                            line + 2,
                            msg
                        )))
                    }
                    RowPolicy::Lenient => {
                        skipped += 1;
                        continue;
                    }
                }
            }

            rows.push(row);
        }

        Ok(Self {
            variables,
            rows,
            ranges,
            skipped,
        })
    }

    /// Write the dataset to a CSV file with a header row, overwriting any
    /// existing file.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        writer.write_record(&self.variables)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|v| v.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no points.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The variable names, in column order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Rows dropped during lenient loading.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// The raw rows, one `Vec<f64>` per point in variable order.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// One point as a name-keyed assignment.
    pub fn point(&self, i: usize) -> Point {
        self.variables
            .iter()
            .cloned()
            .zip(self.rows[i].iter().copied())
            .collect()
    }

    /// All points as name-keyed assignments.
    pub fn points(&self) -> Vec<Point> {
        (0..self.len()).map(|i| self.point(i)).collect()
    }

    /// A copy of one variable's column.
    pub fn column(&self, name: &str) -> Option<Array1<f64>> {
        let idx = self.variables.iter().position(|v| v == name)?;
        Some(Array1::from_iter(self.rows.iter().map(|row| row[idx])))
    }

    /// The declared range of one variable at build time.
    pub fn range(&self, name: &str) -> Option<(f64, f64)> {
        let idx = self.variables.iter().position(|v| v == name)?;
        Some(self.ranges[idx])
    }

    /// Sample mean of one variable's column.
    pub fn mean(&self, name: &str) -> Option<f64> {
        let col = self.column(name)?;
        if col.is_empty() {
            return None;
        }
        Some(col.sum() / col.len() as f64)
    }

    /// Unbiased sample variance of one variable's column.
    pub fn variance(&self, name: &str) -> Option<f64> {
        let col = self.column(name)?;
        if col.len() < 2 {
            return None;
        }
        let mean = col.sum() / col.len() as f64;
        let ss: f64 = col.iter().map(|v| (v - mean).powi(2)).sum();
        Some(ss / (col.len() - 1) as f64)
    }
}

fn declared_ranges(variables: &[String], params: &Parameters) -> Result<Vec<(f64, f64)>> {
    variables
        .iter()
        .map(|name| {
            let param = params
                .get(name)
                .ok_or_else(|| MlFitError::ParameterNotFound(name.clone()))?;
            Ok((param.min(), param.max()))
        })
        .collect()
}

fn validate_row(
    row: &[f64],
    variables: &[String],
    ranges: &[(f64, f64)],
) -> std::result::Result<(), String> {
    if row.len() != variables.len() {
        return Err(format!(
            "expected {} values, got {}",
            variables.len(),
            row.len()
        ));
    }
    for ((value, name), (lo, hi)) in row.iter().zip(variables).zip(ranges) {
        if !value.is_finite() {
            return Err(format!("non-finite value for '{}'", name));
        }
        if value < lo || value > hi {
            return Err(format!(
                "value {} for '{}' outside [{}, {}]",
                value, name, lo, hi
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn params() -> Parameters {
        let mut p = Parameters::new();
        p.add_param_with_bounds("mbc", 5.2, 5.1, 5.3).unwrap();
        p
    }

    fn write_temp_csv(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_from_rows_validates_bounds() {
        let p = params();
        let ok = Dataset::from_rows(
            vec!["mbc".to_string()],
            vec![vec![5.15], vec![5.25]],
            &p,
        );
        assert_eq!(ok.unwrap().len(), 2);

        let bad = Dataset::from_rows(vec!["mbc".to_string()], vec![vec![5.5]], &p);
        assert!(matches!(bad, Err(MlFitError::MalformedRecord(_))));
    }

    #[test]
    fn test_csv_round_trip() {
        let p = params();
        let data = Dataset::from_rows(
            vec!["mbc".to_string()],
            vec![vec![5.15], vec![5.25], vec![5.29]],
            &p,
        )
        .unwrap();

        let path = std::env::temp_dir().join("mlfit_round_trip.csv");
        data.to_csv(&path).unwrap();

        let back = Dataset::from_csv(&path, &p, &["mbc"], RowPolicy::Strict).unwrap();
        assert_eq!(back.len(), 3);
        assert_eq!(back.column("mbc").unwrap()[2], 5.29);
    }

    #[test]
    fn test_strict_fails_on_bad_row() {
        let p = params();
        let path = write_temp_csv(
            "mlfit_strict.csv",
            "mbc\n5.15\nnot-a-number\n5.25\n",
        );

        let result = Dataset::from_csv(&path, &p, &["mbc"], RowPolicy::Strict);
        assert!(matches!(result, Err(MlFitError::MalformedRecord(_))));
    }

    #[test]
    fn test_lenient_skips_and_counts() {
        let p = params();
        let path = write_temp_csv(
            "mlfit_lenient.csv",
            "mbc\n5.15\nnot-a-number\n9.99\n5.25\n",
        );

        let data = Dataset::from_csv(&path, &p, &["mbc"], RowPolicy::Lenient).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.skipped(), 2);
    }

    #[test]
    fn test_missing_column_always_fails() {
        let p = params();
        let path = write_temp_csv("mlfit_schema.csv", "other\n1.0\n");

        for policy in [RowPolicy::Strict, RowPolicy::Lenient] {
            let result = Dataset::from_csv(&path, &p, &["mbc"], policy);
            assert!(matches!(result, Err(MlFitError::MalformedRecord(_))));
        }
    }

    #[test]
    fn test_column_statistics() {
        let p = params();
        let data = Dataset::from_rows(
            vec!["mbc".to_string()],
            vec![vec![5.2], vec![5.24], vec![5.28]],
            &p,
        )
        .unwrap();

        assert!((data.mean("mbc").unwrap() - 5.24).abs() < 1e-12);
        assert!((data.variance("mbc").unwrap() - 0.0016).abs() < 1e-12);
        assert!(data.mean("ghost").is_none());
    }
}
