//! Distribution Module
//! Histogram binning and Gaussian kernel density estimation for numeric columns.

use serde::Serialize;
use statrs::distribution::{Continuous, Normal};
use statrs::statistics::Statistics;

/// Default bin count for the electric range histogram.
pub const DEFAULT_BINS: usize = 30;

/// A single histogram bin, `[lower, upper)`; the last bin is closed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

/// Equal-width histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    /// Bin `values` into `bins` equal-width buckets spanning their range.
    ///
    /// Non-finite values are ignored. When all values are equal the bins
    /// cover `[v - 0.5, v + 0.5]`.
    pub fn from_values(values: &[f64], bins: usize) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() || bins == 0 {
            return Self { bins: Vec::new() };
        }

        let mut min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let mut max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if min == max {
            min -= 0.5;
            max += 0.5;
        }

        let width = (max - min) / bins as f64;
        let mut counts = vec![0u64; bins];
        for v in &finite {
            let idx = (((v - min) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }

        let bins = counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                lower: min + i as f64 * width,
                upper: min + (i + 1) as f64 * width,
                count,
            })
            .collect();

        Self { bins }
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.bins.iter().map(|b| b.count).sum()
    }

    pub fn max_count(&self) -> u64 {
        self.bins.iter().map(|b| b.count).max().unwrap_or(0)
    }

    pub fn bin_width(&self) -> f64 {
        self.bins.first().map(|b| b.upper - b.lower).unwrap_or(0.0)
    }

    /// `(min, max)` of the binned span.
    pub fn span(&self) -> Option<(f64, f64)> {
        Some((self.bins.first()?.lower, self.bins.last()?.upper))
    }
}

/// Gaussian kernel density estimate with Scott's-rule bandwidth.
#[derive(Debug, Clone)]
pub struct Kde {
    samples: Vec<f64>,
    bandwidth: f64,
    kernel: Normal,
}

impl Kde {
    /// Returns `None` for fewer than two samples or zero spread.
    pub fn gaussian(values: &[f64]) -> Option<Self> {
        let samples: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if samples.len() < 2 {
            return None;
        }

        let sd = samples.iter().std_dev();
        let bandwidth = sd * (samples.len() as f64).powf(-0.2);
        if !bandwidth.is_finite() || bandwidth <= 0.0 {
            return None;
        }

        let kernel = Normal::new(0.0, 1.0).ok()?;
        Some(Self {
            samples,
            bandwidth,
            kernel,
        })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Probability density at `x`.
    pub fn density(&self, x: f64) -> f64 {
        let n = self.samples.len() as f64;
        let sum: f64 = self
            .samples
            .iter()
            .map(|xi| self.kernel.pdf((x - xi) / self.bandwidth))
            .sum();
        sum / (n * self.bandwidth)
    }

    /// Density curve scaled to histogram counts, for overlay on `histogram`.
    pub fn curve_for(&self, histogram: &Histogram, points: usize) -> Vec<(f64, f64)> {
        let Some((lo, hi)) = histogram.span() else {
            return Vec::new();
        };
        let scale = self.samples.len() as f64 * histogram.bin_width();
        let steps = points.max(2);

        (0..steps)
            .map(|i| {
                let x = lo + (hi - lo) * i as f64 / (steps - 1) as f64;
                (x, self.density(x) * scale)
            })
            .collect()
    }
}
