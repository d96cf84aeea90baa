//! Plot rendering: projecting densities and datasets onto output documents.
//!
//! The renderer is a thin consumer of `Density` and `Dataset` outputs. It
//! owns no numeric machinery beyond binning and curve scaling; everything it
//! draws was computed elsewhere. Rendering goes through Plotters' SVG
//! backend, and the render mode is explicit configuration: batch rendering
//! writes documents, a dry run only validates.

pub mod frame;

pub use frame::{Binning, Frame, PlotColor};

use crate::dataset::Dataset;
use crate::density::{observable_range, Curve, Density};
use crate::error::{MlFitError, Result};
use crate::parameters::Parameters;
use frame::FrameSeries;
use plotters::prelude::*;
use std::path::Path;

/// How the renderer treats output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Write SVG documents to disk, overwriting existing files.
    Batch,

    /// Build and validate frames but write nothing. Useful in tests and for
    /// checking a plotting sequence without touching the filesystem.
    DryRun,
}

/// Renders frames of datasets and density projections.
#[derive(Debug, Clone)]
pub struct PlotRenderer {
    mode: RenderMode,
    width: u32,
    height: u32,
    resolution: usize,
}

impl PlotRenderer {
    /// Create a renderer in the given mode.
    pub fn new(mode: RenderMode) -> Self {
        Self {
            mode,
            width: 800,
            height: 600,
            resolution: 200,
        }
    }

    /// Set the output document size in pixels.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the number of points used for density projection curves.
    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution.max(2);
        self
    }

    /// The renderer's mode.
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Create an empty frame scoped to one observable's declared range.
    ///
    /// The x-axis label is taken from the parameter's display label and
    /// unit.
    pub fn frame(&self, params: &Parameters, observable: &str) -> Result<Frame> {
        let range = observable_range(params, observable)?;
        let param = params
            .get(observable)
            .ok_or_else(|| MlFitError::ParameterNotFound(observable.to_string()))?;

        let x_label = match &param.unit {
            Some(unit) => format!("{} [{}]", param.label, unit),
            None => param.label.clone(),
        };

        Ok(Frame::new(observable, range, x_label))
    }

    /// Draw a binned histogram of the frame variable onto the frame.
    ///
    /// The binning must lie inside the frame's range. Values outside the
    /// binning are ignored (they are still inside the variable's declared
    /// bounds, just not plotted).
    pub fn draw_dataset(
        &self,
        frame: &mut Frame,
        dataset: &Dataset,
        binning: Binning,
    ) -> Result<()> {
        let (lo, hi) = frame.range();
        if binning.lo < lo - 1e-12 || binning.hi > hi + 1e-12 {
            return Err(MlFitError::Domain(format!(
                "binning [{}, {}] extends beyond the frame range [{}, {}]",
                binning.lo, binning.hi, lo, hi
            )));
        }

        let column = dataset.column(frame.variable()).ok_or_else(|| {
            MlFitError::Domain(format!(
                "dataset has no variable '{}'",
                frame.variable()
            ))
        })?;

        let mut counts = vec![0.0f64; binning.bins];
        for &x in column.iter() {
            if let Some(i) = binning.index_of(x) {
                counts[i] += 1.0;
            }
        }

        let centers = (0..binning.bins).map(|i| binning.center(i)).collect();
        frame.bin_width = Some(binning.width());
        frame.series.push(FrameSeries::Histogram {
            centers,
            counts,
            color: PlotColor::Black,
        });
        Ok(())
    }

    /// Draw the density's projection onto the frame variable.
    ///
    /// With `normalize_to = Some(n)` the normalized curve is scaled to
    /// overlay a binned dataset of `n` events (it needs a histogram on the
    /// frame to know the bin width). With `None` the raw normalized
    /// projection is drawn.
    pub fn draw_density(
        &self,
        frame: &mut Frame,
        density: &Density,
        params: &Parameters,
        color: PlotColor,
        normalize_to: Option<f64>,
    ) -> Result<()> {
        let curve = density.project(params, frame.variable(), self.resolution)?;

        let scale = match normalize_to {
            None => 1.0,
            Some(n) => {
                let bin_width = frame.bin_width.ok_or_else(|| {
                    MlFitError::Render(
                        "normalize_to needs a binned dataset on the frame first".to_string(),
                    )
                })?;
                n * bin_width
            }
        };

        let points = curve
            .points
            .into_iter()
            .map(|(x, y)| (x, y * scale))
            .collect();
        frame.series.push(FrameSeries::Curve { points, color });
        Ok(())
    }

    /// Draw a raw curve (e.g. an NLL scan) onto the frame.
    pub fn draw_curve(&self, frame: &mut Frame, curve: &Curve, color: PlotColor) {
        frame.series.push(FrameSeries::Curve {
            points: curve.points.clone(),
            color,
        });
    }

    /// Serialize the frame to an SVG document at `path`, overwriting any
    /// existing file. A dry-run renderer validates and returns without
    /// writing.
    pub fn save<P: AsRef<Path>>(&self, frame: &Frame, path: P) -> Result<()> {
        if self.mode == RenderMode::DryRun {
            return Ok(());
        }

        let (x0, x1) = frame.range();
        let (y0, y1) = y_bounds(frame);

        let root = SVGBackend::new(path.as_ref(), (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&frame.title, ("sans-serif", 22))
            .margin(12)
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 44)
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .x_desc(frame.x_label.clone())
            .y_desc(y_label(frame))
            .x_labels(8)
            .y_labels(8)
            .label_style(("sans-serif", 14))
            .draw()
            .map_err(render_err)?;

        for series in &frame.series {
            match series {
                FrameSeries::Histogram {
                    centers,
                    counts,
                    color,
                } => {
                    let rgb = color.rgb();

                    // Poisson error bars as thin vertical segments
                    for (&x, &n) in centers.iter().zip(counts.iter()) {
                        let err = n.sqrt();
                        chart
                            .draw_series(LineSeries::new(
                                vec![(x, (n - err).max(0.0)), (x, n + err)],
                                &rgb,
                            ))
                            .map_err(render_err)?;
                    }

                    chart
                        .draw_series(
                            centers
                                .iter()
                                .zip(counts.iter())
                                .map(|(&x, &n)| Circle::new((x, n), 2, rgb.filled())),
                        )
                        .map_err(render_err)?;
                }
                FrameSeries::Curve { points, color } => {
                    chart
                        .draw_series(LineSeries::new(points.iter().copied(), &color.rgb()))
                        .map_err(render_err)?;
                }
            }
        }

        root.present().map_err(render_err)?;
        Ok(())
    }
}

fn render_err<E: std::fmt::Display>(e: E) -> MlFitError {
    MlFitError::Render(e.to_string())
}

fn y_label(frame: &Frame) -> &'static str {
    let has_histogram = frame
        .series
        .iter()
        .any(|s| matches!(s, FrameSeries::Histogram { .. }));
    if has_histogram {
        "Events / bin"
    } else {
        "Value"
    }
}

/// Y-axis bounds covering every series, padded; an empty frame gets a unit
/// axis.
fn y_bounds(frame: &Frame) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    let mut has_histogram = false;

    for series in &frame.series {
        match series {
            FrameSeries::Histogram { counts, .. } => {
                has_histogram = true;
                for &n in counts {
                    lo = lo.min(n);
                    hi = hi.max(n + n.sqrt());
                }
            }
            FrameSeries::Curve { points, .. } => {
                for &(_, y) in points {
                    lo = lo.min(y);
                    hi = hi.max(y);
                }
            }
        }
    }

    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }

    // Counts are anchored at zero; bare curves keep their own baseline
    if has_histogram {
        lo = 0.0;
    }
    let pad = 0.05 * (hi - lo).max(1e-12);
    (if has_histogram { 0.0 } else { lo - pad }, hi + pad)
}
