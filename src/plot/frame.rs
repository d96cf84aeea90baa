//! Frames: axis-scoped containers of drawable series.
//!
//! A frame is created from one observable and carries that observable's
//! declared range as its x axis. Drawing calls append series (binned data,
//! projected density curves, raw curves); nothing touches the output
//! document until [`PlotRenderer::save`].
//!
//! [`PlotRenderer::save`]: crate::plot::PlotRenderer::save

use crate::error::{MlFitError, Result};
use plotters::style::RGBColor;

/// Uniform binning over a closed range.
#[derive(Debug, Clone, Copy)]
pub struct Binning {
    /// Number of bins.
    pub bins: usize,

    /// Lower edge of the first bin.
    pub lo: f64,

    /// Upper edge of the last bin.
    pub hi: f64,
}

impl Binning {
    /// Create a binning; fails on zero bins or an empty range.
    pub fn new(bins: usize, lo: f64, hi: f64) -> Result<Self> {
        if bins == 0 {
            return Err(MlFitError::InvalidParameter(
                "binning needs at least one bin".to_string(),
            ));
        }
        if hi <= lo {
            return Err(MlFitError::Domain(format!(
                "binning range [{}, {}] has zero or negative width",
                lo, hi
            )));
        }
        Ok(Self { bins, lo, hi })
    }

    /// Width of one bin.
    pub fn width(&self) -> f64 {
        (self.hi - self.lo) / self.bins as f64
    }

    /// Center of bin `i`.
    pub fn center(&self, i: usize) -> f64 {
        self.lo + (i as f64 + 0.5) * self.width()
    }

    /// The bin index containing `x`, if any.
    pub fn index_of(&self, x: f64) -> Option<usize> {
        if x < self.lo || x > self.hi {
            return None;
        }
        let i = ((x - self.lo) / self.width()) as usize;
        Some(i.min(self.bins - 1))
    }
}

/// Line/marker colors, mapped to fixed RGB values at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotColor {
    Black,
    Blue,
    Red,
    Green,
    Orange,
    Magenta,
}

impl PlotColor {
    pub(crate) fn rgb(self) -> RGBColor {
        match self {
            PlotColor::Black => RGBColor(0, 0, 0),
            PlotColor::Blue => RGBColor(30, 80, 200),
            PlotColor::Red => RGBColor(200, 30, 30),
            PlotColor::Green => RGBColor(20, 140, 60),
            PlotColor::Orange => RGBColor(230, 140, 20),
            PlotColor::Magenta => RGBColor(180, 40, 160),
        }
    }
}

/// One drawable series on a frame.
#[derive(Debug, Clone)]
pub(crate) enum FrameSeries {
    /// Binned event counts with Poisson error bars.
    Histogram {
        centers: Vec<f64>,
        counts: Vec<f64>,
        color: PlotColor,
    },

    /// A continuous curve.
    Curve {
        points: Vec<(f64, f64)>,
        color: PlotColor,
    },
}

/// An axis-scoped plotting context for one observable.
#[derive(Debug, Clone)]
pub struct Frame {
    pub(crate) variable: String,
    pub(crate) range: (f64, f64),
    pub(crate) title: String,
    pub(crate) x_label: String,
    pub(crate) series: Vec<FrameSeries>,

    /// Bin width of the most recent histogram, used to scale density curves
    /// onto binned counts.
    pub(crate) bin_width: Option<f64>,
}

impl Frame {
    pub(crate) fn new(variable: &str, range: (f64, f64), x_label: String) -> Self {
        Self {
            variable: variable.to_string(),
            range,
            title: String::new(),
            x_label,
            series: Vec::new(),
            bin_width: None,
        }
    }

    /// The observable this frame is scoped to.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// The x-axis range (the observable's declared bounds).
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Set the frame title.
    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    /// Number of series drawn so far.
    pub fn series_count(&self) -> usize {
        self.series.len()
    }
}
