//! Spatial module - geocoded points, county boundaries, and the spatial join

pub mod boundary;
pub mod crs;
pub mod joiner;
pub mod points;
pub mod states;

pub use boundary::{
    source_for_path, BoundaryError, BoundarySet, BoundarySource, CountyPolygon, GeoJsonSource,
    InMemorySource, ShapefileSource,
};
pub use crs::Crs;
pub use joiner::{log_scale, top_counties, CountyCount, CountySummary, JoinError, JoinOutcome, SpatialJoiner};
pub use points::PointCollection;
pub use states::{State, StateError};
