//! Spatial Joiner Module
//! Counts registration points per county polygon.
//!
//! Points and polygons are brought into one CRS, candidate counties come from
//! an R-tree over polygon bounding boxes, and each candidate is confirmed with
//! an exact intersects test. Points that hit no county are dropped. A point on
//! a shared border counts for every county it touches.

use crate::spatial::{BoundarySet, CountyPolygon, Crs, PointCollection};
use geo::{BoundingRect, Intersects, Point};
use rstar::{RTree, RTreeObject, AABB};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum JoinError {
    #[error("No county boundaries found for state FIPS {0}")]
    NoCounties(String),
}

/// A county with its joined registration count.
#[derive(Debug, Clone, PartialEq)]
pub struct CountyCount {
    pub county: CountyPolygon,
    pub count: u64,
    /// `ln(count + 1)`
    pub log_count: f64,
}

impl CountyCount {
    pub fn new(county: CountyPolygon, count: u64) -> Self {
        Self {
            county,
            count,
            log_count: log_scale(count),
        }
    }

    pub fn name(&self) -> &str {
        &self.county.name
    }
}

/// Display scale for counts: `ln(count + 1)`, zero at zero.
pub fn log_scale(count: u64) -> f64 {
    (count as f64).ln_1p()
}

/// Serializable view of a county count.
#[derive(Debug, Clone, Serialize)]
pub struct CountySummary {
    pub name: String,
    pub county_fips: Option<String>,
    pub count: u64,
    pub log_count: f64,
}

impl From<&CountyCount> for CountySummary {
    fn from(c: &CountyCount) -> Self {
        Self {
            name: c.county.name.clone(),
            county_fips: c.county.county_fips.clone(),
            count: c.count,
            log_count: c.log_count,
        }
    }
}

/// Result of joining points onto one state's counties.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub crs: Crs,
    /// Every county of the state, in boundary-file order.
    pub counties: Vec<CountyCount>,
    /// Points that fell inside at least one county
    pub matched: usize,
    /// Points that fell inside none
    pub unmatched: usize,
}

impl JoinOutcome {
    pub fn get(&self, name: &str) -> Option<u64> {
        self.counties
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.count)
    }

    /// The `n` highest counts. Ties keep boundary-file order.
    pub fn top(&self, n: usize) -> Vec<&CountyCount> {
        top_counties(&self.counties, n)
    }

    pub fn summaries(&self) -> Vec<CountySummary> {
        self.counties.iter().map(CountySummary::from).collect()
    }
}

/// The `n` highest counts; a stable sort, so ties keep input order.
pub fn top_counties(counties: &[CountyCount], n: usize) -> Vec<&CountyCount> {
    let mut ranked: Vec<&CountyCount> = counties.iter().collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(n);
    ranked
}

struct IndexedCounty {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedCounty {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Joins registration points onto the counties of one state.
pub struct SpatialJoiner {
    state_fips: String,
    working_crs: Crs,
}

impl SpatialJoiner {
    pub fn new(state_fips: impl Into<String>) -> Self {
        Self {
            state_fips: state_fips.into(),
            working_crs: Crs::Wgs84,
        }
    }

    /// Use `crs` as the common CRS for the intersection tests.
    pub fn with_working_crs(mut self, crs: Crs) -> Self {
        self.working_crs = crs;
        self
    }

    pub fn join(
        &self,
        points: &PointCollection,
        boundaries: BoundarySet,
    ) -> Result<JoinOutcome, JoinError> {
        let counties = boundaries
            .for_state(&self.state_fips)
            .to_crs(self.working_crs);
        if counties.is_empty() {
            return Err(JoinError::NoCounties(self.state_fips.clone()));
        }

        let index = build_index(&counties);
        let mut counts: HashMap<String, u64> = HashMap::new();
        let mut matched = 0usize;
        let mut unmatched = 0usize;

        for coord in points.coords_in(self.working_crs) {
            let point = Point::from(coord);
            let probe = AABB::from_point([coord.x, coord.y]);
            let mut hit = false;

            for candidate in index.locate_in_envelope_intersecting(&probe) {
                let county = &counties.counties[candidate.index];
                if county.geometry.intersects(&point) {
                    *counts.entry(county.name.clone()).or_default() += 1;
                    hit = true;
                }
            }

            if hit {
                matched += 1;
            } else {
                unmatched += 1;
            }
        }

        debug!(matched, unmatched, "Spatial join finished");

        // Merge by name: counties sharing a name both receive the combined count.
        let counties: Vec<CountyCount> = counties
            .counties
            .into_iter()
            .map(|county| {
                let count = counts.get(&county.name).copied().unwrap_or(0);
                CountyCount::new(county, count)
            })
            .collect();

        info!(
            state = %self.state_fips,
            counties = counties.len(),
            matched,
            "Joined registrations to counties"
        );

        Ok(JoinOutcome {
            crs: self.working_crs,
            counties,
            matched,
            unmatched,
        })
    }
}

fn build_index(set: &BoundarySet) -> RTree<IndexedCounty> {
    let entries = set
        .counties
        .iter()
        .enumerate()
        .filter_map(|(index, county)| {
            let bbox = county.geometry.bounding_rect()?;
            Some(IndexedCounty {
                index,
                envelope: AABB::from_corners(
                    [bbox.min().x, bbox.min().y],
                    [bbox.max().x, bbox.max().y],
                ),
            })
        })
        .collect();
    RTree::bulk_load(entries)
}
