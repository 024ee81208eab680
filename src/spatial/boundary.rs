//! County boundary suppliers.
//!
//! The spatial join reads county polygons through [`BoundarySource`], so the
//! run can use a TIGER shapefile, a GeoJSON export, or a literal polygon set.

use crate::spatial::crs::{is_projected_wkt, Crs};
use geo::MultiPolygon;
use shapefile::dbase::{FieldValue, Record};
use shapefile::Shape;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const STATE_FIELD: &str = "STATEFP";
pub const COUNTY_FIELD: &str = "COUNTYFP";
pub const NAME_FIELD: &str = "NAME";

#[derive(Error, Debug)]
pub enum BoundaryError {
    #[error("Boundary file not found: {0}")]
    NotFound(PathBuf),
    #[error("Unsupported boundary format: {0}")]
    UnsupportedFormat(String),
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("Malformed GeoJSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported projected CRS in {path:?}; reproject the boundaries to EPSG:4269, EPSG:4326 or EPSG:3857")]
    UnsupportedCrs { path: PathBuf },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Boundary file has no '{0}' field")]
    MissingField(String),
    #[error("GeoJSON boundaries must be a FeatureCollection")]
    NotFeatureCollection,
    #[error("Failed to convert geometry: {0}")]
    Geometry(String),
}

/// A county boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct CountyPolygon {
    pub state_fips: String,
    pub county_fips: Option<String>,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// County polygons in a single CRS, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundarySet {
    pub crs: Crs,
    pub counties: Vec<CountyPolygon>,
}

impl BoundarySet {
    pub fn new(crs: Crs, counties: Vec<CountyPolygon>) -> Self {
        Self { crs, counties }
    }

    /// Keep counties whose state code equals `state_fips`.
    pub fn for_state(self, state_fips: &str) -> Self {
        let counties = self
            .counties
            .into_iter()
            .filter(|c| c.state_fips == state_fips)
            .collect();
        Self {
            crs: self.crs,
            counties,
        }
    }

    pub fn to_crs(self, target: Crs) -> Self {
        if self.crs == target {
            return self;
        }
        let from = self.crs;
        let counties = self
            .counties
            .into_iter()
            .map(|c| CountyPolygon {
                geometry: from.reproject(&c.geometry, target),
                ..c
            })
            .collect();
        Self {
            crs: target,
            counties,
        }
    }

    pub fn len(&self) -> usize {
        self.counties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counties.is_empty()
    }
}

/// Supplies county boundaries to the spatial join.
pub trait BoundarySource {
    fn load(&self) -> Result<BoundarySet, BoundaryError>;

    /// Human-readable origin for logs.
    fn describe(&self) -> String;
}

/// Pick a source for `path` by its extension.
pub fn source_for_path(path: &Path) -> Result<Box<dyn BoundarySource>, BoundaryError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "shp" => Ok(Box::new(ShapefileSource::new(path))),
        "json" | "geojson" => Ok(Box::new(GeoJsonSource::new(path))),
        other => Err(BoundaryError::UnsupportedFormat(other.to_string())),
    }
}

/// TIGER/Line style shapefile with `STATEFP`, `COUNTYFP`, `NAME`.
pub struct ShapefileSource {
    path: PathBuf,
}

impl ShapefileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// CRS from the `.prj` sidecar.
    ///
    /// NAD83 when the sidecar is absent or names an unknown geographic system.
    /// Unknown projected systems are an error: their coordinates are not degrees.
    fn detect_crs(&self) -> Result<Crs, BoundaryError> {
        let prj = self.path.with_extension("prj");
        let Ok(wkt) = fs::read_to_string(&prj) else {
            debug!(path = %prj.display(), "No .prj sidecar, assuming NAD83");
            return Ok(Crs::Nad83);
        };

        match Crs::from_prj(&wkt) {
            Some(crs) => Ok(crs),
            None if is_projected_wkt(&wkt) => Err(BoundaryError::UnsupportedCrs { path: prj }),
            None => {
                warn!(path = %prj.display(), "Unrecognised .prj, assuming NAD83");
                Ok(Crs::Nad83)
            }
        }
    }
}

impl BoundarySource for ShapefileSource {
    fn load(&self) -> Result<BoundarySet, BoundaryError> {
        if !self.path.is_file() {
            return Err(BoundaryError::NotFound(self.path.clone()));
        }

        let crs = self.detect_crs()?;
        let mut reader = shapefile::Reader::from_path(&self.path)?;
        let mut counties = Vec::new();

        for result in reader.iter_shapes_and_records() {
            let (shape, record) = result?;

            let Some(state_fips) = character_field(&record, STATE_FIELD)? else {
                continue;
            };
            let Some(name) = character_field(&record, NAME_FIELD)? else {
                continue;
            };
            let county_fips = character_field(&record, COUNTY_FIELD).ok().flatten();

            let geometry: MultiPolygon<f64> = match shape {
                Shape::Polygon(polygon) => polygon
                    .try_into()
                    .map_err(|e| BoundaryError::Geometry(format!("{:?}", e)))?,
                Shape::PolygonM(polygon) => polygon
                    .try_into()
                    .map_err(|e| BoundaryError::Geometry(format!("{:?}", e)))?,
                Shape::PolygonZ(polygon) => polygon
                    .try_into()
                    .map_err(|e| BoundaryError::Geometry(format!("{:?}", e)))?,
                _ => continue,
            };

            counties.push(CountyPolygon {
                state_fips,
                county_fips,
                name,
                geometry,
            });
        }

        info!(path = %self.path.display(), counties = counties.len(), %crs, "Loaded shapefile boundaries");
        Ok(BoundarySet::new(crs, counties))
    }

    fn describe(&self) -> String {
        format!("shapefile {}", self.path.display())
    }
}

fn character_field(record: &Record, field: &str) -> Result<Option<String>, BoundaryError> {
    match record.get(field) {
        Some(FieldValue::Character(value)) => Ok(value.as_ref().map(|s| s.trim().to_string())),
        Some(FieldValue::Numeric(value)) => Ok(value.map(|n| n.to_string())),
        Some(_) => Ok(None),
        None => Err(BoundaryError::MissingField(field.to_string())),
    }
}

/// GeoJSON FeatureCollection with `STATEFP`, `COUNTYFP`, `NAME` properties.
pub struct GeoJsonSource {
    path: PathBuf,
}

impl GeoJsonSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BoundarySource for GeoJsonSource {
    fn load(&self) -> Result<BoundarySet, BoundaryError> {
        use geojson::GeoJson;

        if !self.path.is_file() {
            return Err(BoundaryError::NotFound(self.path.clone()));
        }

        let file = File::open(&self.path)?;
        let geojson = GeoJson::from_reader(BufReader::new(file))?;
        let counties = counties_from_geojson(geojson)?;

        info!(path = %self.path.display(), counties = counties.len(), "Loaded GeoJSON boundaries");
        Ok(BoundarySet::new(Crs::Wgs84, counties))
    }

    fn describe(&self) -> String {
        format!("GeoJSON {}", self.path.display())
    }
}

/// Extract county polygons from a parsed GeoJSON document.
pub fn counties_from_geojson(geojson: geojson::GeoJson) -> Result<Vec<CountyPolygon>, BoundaryError> {
    let geojson::GeoJson::FeatureCollection(collection) = geojson else {
        return Err(BoundaryError::NotFeatureCollection);
    };

    let mut counties = Vec::new();

    for feature in collection.features {
        let props = feature.properties.as_ref();
        let (Some(state_fips), Some(name)) = (
            property_string(props, STATE_FIELD, 2),
            property_string(props, NAME_FIELD, 0),
        ) else {
            continue;
        };
        let county_fips = property_string(props, COUNTY_FIELD, 3);

        let geometry = match feature.geometry {
            Some(geom) => {
                let geo_geom: geo::Geometry<f64> = geom.value.try_into()?;
                match geo_geom {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue,
                }
            }
            None => continue,
        };

        counties.push(CountyPolygon {
            state_fips,
            county_fips,
            name,
            geometry,
        });
    }

    Ok(counties)
}

/// Property as a string; integral numbers are zero-padded to `width` digits.
fn property_string(props: Option<&geojson::JsonObject>, key: &str, width: usize) -> Option<String> {
    match props?.get(key)? {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => match n.as_u64() {
            Some(code) => Some(format!("{code:0width$}")),
            None => Some(n.to_string()),
        },
        _ => None,
    }
}

/// A literal boundary set, for tests and embedded data.
pub struct InMemorySource {
    set: BoundarySet,
}

impl InMemorySource {
    pub fn new(set: BoundarySet) -> Self {
        Self { set }
    }
}

impl BoundarySource for InMemorySource {
    fn load(&self) -> Result<BoundarySet, BoundaryError> {
        Ok(self.set.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory set of {} counties", self.set.len())
    }
}
