//! Static Chart Renderer
//! Draws bar charts and histograms into in-memory RGB images with plotters.
//!
//! Charts:
//! 1. Vertical bars: one solid color, categories left to right
//! 2. Horizontal bars: viridis per bar, largest at the top
//! 3. Histogram: filled bins with an optional density curve overlay

use crate::charts::palette::{viridis_steps, EDGE};
use crate::stats::{AggregationResult, Histogram};
use image::RgbImage;
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing error: {0}")]
    Draw(String),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid image buffer for {0}x{1}")]
    Buffer(u32, u32),
    #[error("Nothing to plot for '{0}'")]
    Empty(String),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for RenderError {
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        RenderError::Draw(e.to_string())
    }
}

pub type Canvas<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// A rendered RGB chart.
#[derive(Debug, Clone)]
pub struct ChartImage {
    pub width: u32,
    pub height: u32,
    pixels: Vec<u8>,
}

impl ChartImage {
    pub fn to_rgb_image(&self) -> Result<RgbImage, RenderError> {
        RgbImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or(RenderError::Buffer(self.width, self.height))
    }

    /// Save as an image file; the format follows the extension.
    pub fn save(&self, path: &Path) -> Result<(), RenderError> {
        self.to_rgb_image()?.save(path)?;
        Ok(())
    }
}

/// Draw onto a white canvas of `size` and capture the pixels.
pub fn render_with<F>(size: (u32, u32), draw: F) -> Result<ChartImage, RenderError>
where
    F: FnOnce(&Canvas) -> Result<(), RenderError>,
{
    let (width, height) = size;
    let mut pixels = vec![255u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, size).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root)?;
        root.present()?;
    }
    Ok(ChartImage {
        width,
        height,
        pixels,
    })
}

/// Title and axis descriptions for a chart.
#[derive(Debug, Clone)]
pub struct ChartLabels {
    pub title: String,
    pub x: String,
    pub y: String,
}

impl ChartLabels {
    pub fn new(title: &str, x: &str, y: &str) -> Self {
        Self {
            title: title.to_string(),
            x: x.to_string(),
            y: y.to_string(),
        }
    }
}

/// Bar orientation and fill.
#[derive(Debug, Clone, Copy)]
pub enum BarStyle {
    Vertical(RGBColor),
    HorizontalViridis,
}

/// Upper axis bound leaving headroom above `max`.
pub fn axis_ceiling(max: u64) -> u64 {
    ((max as f64 * 1.1).ceil() as u64).max(max + 1)
}

/// Category name at a segment centre; `reversed` counts from the top.
pub fn segment_label(value: &SegmentValue<usize>, names: &[String], reversed: bool) -> String {
    let SegmentValue::CenterOf(i) = value else {
        return String::new();
    };
    let idx = if reversed {
        names.len().checked_sub(i + 1)
    } else {
        Some(*i)
    };
    idx.and_then(|i| names.get(i)).cloned().unwrap_or_default()
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    pub fn bar_chart(
        result: &AggregationResult,
        labels: &ChartLabels,
        style: BarStyle,
        size: (u32, u32),
    ) -> Result<ChartImage, RenderError> {
        if result.is_empty() {
            return Err(RenderError::Empty(labels.title.clone()));
        }
        match style {
            BarStyle::Vertical(color) => {
                render_with(size, |root| Self::draw_vertical_bars(root, result, labels, color))
            }
            BarStyle::HorizontalViridis => {
                render_with(size, |root| Self::draw_horizontal_bars(root, result, labels))
            }
        }
    }

    fn draw_vertical_bars(
        root: &Canvas,
        result: &AggregationResult,
        labels: &ChartLabels,
        color: RGBColor,
    ) -> Result<(), RenderError> {
        let n = result.len();
        let names = result.labels();

        let mut chart = ChartBuilder::on(root)
            .caption(&labels.title, ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(60)
            .y_label_area_size(70)
            .build_cartesian_2d((0..n).into_segmented(), 0u64..axis_ceiling(result.max_count()))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&|v| segment_label(v, &names, false))
            .x_desc(labels.x.as_str())
            .y_desc(labels.y.as_str())
            .draw()?;

        let bar = |i: usize, count: u64| {
            [
                (SegmentValue::Exact(i), 0u64),
                (SegmentValue::Exact(i + 1), count),
            ]
        };

        chart.draw_series(result.entries.iter().enumerate().map(|(i, (_, count))| {
            let mut rect = Rectangle::new(bar(i, *count), color.filled());
            rect.set_margin(0, 0, 8, 8);
            rect
        }))?;
        chart.draw_series(result.entries.iter().enumerate().map(|(i, (_, count))| {
            let mut rect = Rectangle::new(bar(i, *count), EDGE.stroke_width(1));
            rect.set_margin(0, 0, 8, 8);
            rect
        }))?;

        Ok(())
    }

    fn draw_horizontal_bars(
        root: &Canvas,
        result: &AggregationResult,
        labels: &ChartLabels,
    ) -> Result<(), RenderError> {
        let n = result.len();
        let names = result.labels();
        let colors = viridis_steps(n);

        let mut chart = ChartBuilder::on(root)
            .caption(&labels.title, ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(160)
            .build_cartesian_2d(0u64..axis_ceiling(result.max_count()), (0..n).into_segmented())?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(n)
            .y_label_formatter(&|v| segment_label(v, &names, true))
            .x_desc(labels.x.as_str())
            .y_desc(labels.y.as_str())
            .draw()?;

        // Row 0 is drawn at the top.
        chart.draw_series(result.entries.iter().enumerate().map(|(i, (_, count))| {
            let row = n - 1 - i;
            let mut rect = Rectangle::new(
                [
                    (0u64, SegmentValue::Exact(row)),
                    (*count, SegmentValue::Exact(row + 1)),
                ],
                colors[i].filled(),
            );
            rect.set_margin(4, 4, 0, 0);
            rect
        }))?;

        Ok(())
    }

    /// Histogram with an optional overlay curve in count units.
    pub fn histogram(
        histogram: &Histogram,
        curve: Option<&[(f64, f64)]>,
        labels: &ChartLabels,
        color: RGBColor,
        size: (u32, u32),
    ) -> Result<ChartImage, RenderError> {
        let Some((lo, hi)) = histogram.span() else {
            return Err(RenderError::Empty(labels.title.clone()));
        };
        let curve_max = curve
            .unwrap_or(&[])
            .iter()
            .map(|(_, y)| *y)
            .fold(0.0, f64::max);
        let y_max = (histogram.max_count() as f64).max(curve_max) * 1.1 + 1.0;

        render_with(size, |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(&labels.title, ("sans-serif", 24))
                .margin(15)
                .x_label_area_size(50)
                .y_label_area_size(70)
                .build_cartesian_2d(lo..hi, 0f64..y_max)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_desc(labels.x.as_str())
                .y_desc(labels.y.as_str())
                .y_label_formatter(&|v| format!("{:.0}", v))
                .draw()?;

            chart.draw_series(histogram.bins.iter().map(|b| {
                Rectangle::new([(b.lower, 0.0), (b.upper, b.count as f64)], color.mix(0.6).filled())
            }))?;
            chart.draw_series(histogram.bins.iter().map(|b| {
                Rectangle::new([(b.lower, 0.0), (b.upper, b.count as f64)], EDGE.stroke_width(1))
            }))?;

            if let Some(points) = curve {
                chart.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?;
            }

            Ok(())
        })
    }
}
