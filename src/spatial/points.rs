//! Point geometries built from cleaned registrations.

use crate::data::{CleanRegistrations, ProcessorError};
use crate::spatial::Crs;
use geo::{Coord, Point};

/// Registration locations tagged with one CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCollection {
    pub crs: Crs,
    pub points: Vec<Point<f64>>,
}

impl PointCollection {
    /// One WGS84 point per `(longitude, latitude)` pair. No range checks.
    pub fn from_lon_lat(pairs: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self {
            crs: Crs::Wgs84,
            points: pairs
                .into_iter()
                .map(|(lon, lat)| Point::new(lon, lat))
                .collect(),
        }
    }

    pub fn from_registrations(registrations: &CleanRegistrations) -> Result<Self, ProcessorError> {
        Ok(Self::from_lon_lat(registrations.coordinates()?))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Coordinates converted into `target`, without consuming the collection.
    pub fn coords_in(&self, target: Crs) -> impl Iterator<Item = Coord<f64>> + '_ {
        self.points
            .iter()
            .map(move |p| self.crs.convert(p.0, target))
    }

    pub fn to_crs(self, target: Crs) -> Self {
        if self.crs == target {
            return self;
        }
        let points = self.coords_in(target).map(Point::from).collect();
        Self {
            crs: target,
            points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lon_lat_tags_wgs84() {
        let points = PointCollection::from_lon_lat([(-122.33, 47.61), (-117.42, 47.66)]);

        assert_eq!(points.crs, Crs::Wgs84);
        assert_eq!(points.len(), 2);
        assert_eq!(points.points[0].x(), -122.33);
        assert_eq!(points.points[0].y(), 47.61);
    }

    #[test]
    fn test_to_crs_changes_tag_and_coordinates() {
        let points = PointCollection::from_lon_lat([(0.0, 0.0), (10.0, 0.0)]).to_crs(Crs::WebMercator);

        assert_eq!(points.crs, Crs::WebMercator);
        assert!(points.points[0].x().abs() < 1e-9);
        assert!(points.points[1].x() > 1_000_000.0);
    }
}
