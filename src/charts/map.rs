//! Choropleth Map Renderer
//! Shades county polygons by log registration count.
//!
//! Layout:
//! 1. Title centered above the map
//! 2. Map panel: counties filled with viridis, white borders, no axes
//! 3. Top counties annotated at their centroids as "NAME (count)"
//! 4. Colorbar on the right, labelled with the log scale

use crate::charts::palette::{viridis_scaled, BOUNDARY};
use crate::charts::renderer::{render_with, Canvas, ChartImage, RenderError};
use crate::spatial::{CountyCount, JoinOutcome};
use geo::{BoundingRect, Centroid};
use plotters::prelude::*;
use std::ops::Range;

const LEGEND_WIDTH: u32 = 130;
const COLORBAR_STEPS: usize = 64;
const LABEL_FONT_PX: i32 = 12;

/// Titles for the map and its colorbar.
#[derive(Debug, Clone)]
pub struct MapLabels {
    pub title: String,
    pub legend: String,
}

/// Data extent for the map panel, padded and widened to keep shapes undistorted.
#[derive(Debug, Clone, PartialEq)]
pub struct MapExtent {
    pub x: Range<f64>,
    pub y: Range<f64>,
}

impl MapExtent {
    /// Extent covering every county, fitted to a `panel` of pixels.
    ///
    /// `geographic` applies a cos(latitude) correction to the x scale.
    pub fn fit(counties: &[CountyCount], geographic: bool, panel: (u32, u32)) -> Option<Self> {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);

        for rect in counties.iter().filter_map(|c| c.county.geometry.bounding_rect()) {
            min_x = min_x.min(rect.min().x);
            min_y = min_y.min(rect.min().y);
            max_x = max_x.max(rect.max().x);
            max_y = max_y.max(rect.max().y);
        }
        if !min_x.is_finite() || !max_y.is_finite() {
            return None;
        }

        let pad_x = ((max_x - min_x) * 0.02).max(1e-6);
        let pad_y = ((max_y - min_y) * 0.02).max(1e-6);
        let (mut x0, mut x1) = (min_x - pad_x, max_x + pad_x);
        let (mut y0, mut y1) = (min_y - pad_y, max_y + pad_y);

        let x_scale = if geographic {
            ((y0 + y1) / 2.0).to_radians().cos().abs().max(0.1)
        } else {
            1.0
        };
        let data_aspect = (x1 - x0) * x_scale / (y1 - y0);
        let panel_aspect = panel.0.max(1) as f64 / panel.1.max(1) as f64;

        if data_aspect > panel_aspect {
            let grow = ((x1 - x0) * x_scale / panel_aspect - (y1 - y0)) / 2.0;
            y0 -= grow;
            y1 += grow;
        } else {
            let grow = ((y1 - y0) * panel_aspect / x_scale - (x1 - x0)) / 2.0;
            x0 -= grow;
            x1 += grow;
        }

        Some(Self { x: x0..x1, y: y0..y1 })
    }
}

/// `(min, max)` of the log counts; `(0, 0)` when there are none.
pub fn log_bounds(counties: &[CountyCount]) -> (f64, f64) {
    let min = counties.iter().map(|c| c.log_count).fold(f64::INFINITY, f64::min);
    let max = counties.iter().map(|c| c.log_count).fold(f64::NEG_INFINITY, f64::max);
    if min.is_finite() && max.is_finite() {
        (min, max)
    } else {
        (0.0, 0.0)
    }
}

pub fn annotation_label(county: &CountyCount) -> String {
    format!("{} ({})", county.name(), county.count)
}

pub struct ChoroplethRenderer;

impl ChoroplethRenderer {
    pub fn render(
        outcome: &JoinOutcome,
        labels: &MapLabels,
        annotate: usize,
        size: (u32, u32),
    ) -> Result<ChartImage, RenderError> {
        let (width, height) = size;
        let map_width = width.saturating_sub(LEGEND_WIDTH).max(1);
        let extent = MapExtent::fit(&outcome.counties, outcome.crs.is_geographic(), (map_width, height.saturating_sub(60)))
            .ok_or_else(|| RenderError::Empty(labels.title.clone()))?;
        let (min_log, max_log) = log_bounds(&outcome.counties);

        render_with(size, |root| {
            let (map_area, legend_area) = root.split_horizontally(map_width as i32);

            let mut chart = ChartBuilder::on(&map_area)
                .caption(&labels.title, ("sans-serif", 24))
                .margin(10)
                .build_cartesian_2d(extent.x.clone(), extent.y.clone())?;

            for county in &outcome.counties {
                let fill = viridis_scaled(county.log_count, min_log, max_log);
                for polygon in county.county.geometry.iter() {
                    let exterior: Vec<(f64, f64)> =
                        polygon.exterior().coords().map(|c| (c.x, c.y)).collect();
                    chart.draw_series(std::iter::once(Polygon::new(exterior.clone(), fill.filled())))?;
                    chart.draw_series(std::iter::once(PathElement::new(exterior, BOUNDARY.stroke_width(1))))?;

                    for hole in polygon.interiors() {
                        let ring: Vec<(f64, f64)> = hole.coords().map(|c| (c.x, c.y)).collect();
                        chart.draw_series(std::iter::once(Polygon::new(ring, WHITE.filled())))?;
                    }
                }
            }

            for county in outcome.top(annotate) {
                let Some(centroid) = county.county.geometry.centroid() else {
                    continue;
                };
                let label = annotation_label(county);
                let box_width = label.chars().count() as i32 * 7 + 6;

                chart.draw_series(std::iter::once(
                    EmptyElement::at((centroid.x(), centroid.y()))
                        + Rectangle::new(
                            [(3, -(LABEL_FONT_PX + 3)), (3 + box_width, -1)],
                            WHITE.mix(0.8).filled(),
                        )
                        + Text::new(
                            label,
                            (6, -(LABEL_FONT_PX + 1)),
                            ("sans-serif", LABEL_FONT_PX).into_font().color(&BLACK),
                        ),
                ))?;
            }

            Self::draw_colorbar(&legend_area, min_log, max_log, &labels.legend)
        })
    }

    fn draw_colorbar(area: &Canvas, min: f64, max: f64, legend: &str) -> Result<(), RenderError> {
        let top = if max > min { max } else { min + 1.0 };
        let step = (top - min) / COLORBAR_STEPS as f64;

        let mut bar = ChartBuilder::on(area)
            .margin_top(60)
            .margin_bottom(60)
            .margin_right(20)
            .y_label_area_size(70)
            .build_cartesian_2d(0f64..1f64, min..top)?;

        bar.configure_mesh()
            .disable_mesh()
            .disable_x_axis()
            .y_desc(legend)
            .y_label_formatter(&|v| format!("{:.1}", v))
            .draw()?;

        bar.draw_series((0..COLORBAR_STEPS).map(|i| {
            let lo = min + i as f64 * step;
            Rectangle::new(
                [(0.0, lo), (1.0, lo + step)],
                viridis_scaled(lo + step / 2.0, min, top).filled(),
            )
        }))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::CountyPolygon;
    use geo::{polygon, MultiPolygon};

    fn county(name: &str, x0: f64, y0: f64, count: u64) -> CountyCount {
        CountyCount::new(
            CountyPolygon {
                state_fips: "53".to_string(),
                county_fips: None,
                name: name.to_string(),
                geometry: MultiPolygon::new(vec![polygon![
                    (x: x0, y: y0),
                    (x: x0 + 1.0, y: y0),
                    (x: x0 + 1.0, y: y0 + 1.0),
                    (x: x0, y: y0 + 1.0),
                    (x: x0, y: y0),
                ]]),
            },
            count,
        )
    }

    #[test]
    fn test_extent_covers_all_counties() {
        let counties = vec![county("King", -122.0, 47.0, 3), county("Spokane", -118.0, 47.5, 0)];
        let extent = MapExtent::fit(&counties, true, (1000, 700)).unwrap();

        assert!(extent.x.start < -122.0 && extent.x.end > -117.0);
        assert!(extent.y.start < 47.0 && extent.y.end > 48.5);
    }

    #[test]
    fn test_extent_matches_panel_aspect() {
        let counties = vec![county("A", 0.0, 0.0, 1)];
        let extent = MapExtent::fit(&counties, false, (800, 400)).unwrap();

        let aspect = (extent.x.end - extent.x.start) / (extent.y.end - extent.y.start);
        assert!((aspect - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_extent_of_nothing() {
        assert_eq!(MapExtent::fit(&[], true, (800, 600)), None);
    }

    #[test]
    fn test_log_bounds() {
        let counties = vec![county("A", 0.0, 0.0, 0), county("B", 1.0, 0.0, 99)];
        let (min, max) = log_bounds(&counties);

        assert_eq!(min, 0.0);
        assert!((max - 100f64.ln()).abs() < 1e-12);
        assert_eq!(log_bounds(&[]), (0.0, 0.0));
    }

    #[test]
    fn test_annotation_label() {
        assert_eq!(annotation_label(&county("King", 0.0, 0.0, 1234)), "King (1234)");
    }
}
