//! Record Parser Module
//! Extracts coordinates from packed location strings and drops incomplete rows.

use crate::data::loader::{CITY_COL, COUNTY_COL, LOCATION_COL, RANGE_COL};
use polars::prelude::*;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::info;

pub const LONGITUDE_COL: &str = "Longitude";
pub const LATITUDE_COL: &str = "Latitude";

/// Fields a record needs to survive cleaning.
pub const REQUIRED_FIELDS: [&str; 5] = [
    COUNTY_COL,
    CITY_COL,
    LOCATION_COL,
    LATITUDE_COL,
    LONGITUDE_COL,
];

static LOCATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"POINT \(([^ ]+) ([^\)]+)\)").expect("location pattern is valid")
});

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Parse `POINT (<lon> <lat>)` into `(longitude, latitude)`.
///
/// The pattern may appear anywhere in the string; the first match wins.
/// Returns `None` unless both parts are finite numbers.
pub fn parse_location(raw: &str) -> Option<(f64, f64)> {
    let caps = LOCATION_PATTERN.captures(raw)?;
    let lon = parse_coordinate(caps.get(1)?.as_str())?;
    let lat = parse_coordinate(caps.get(2)?.as_str())?;
    Some((lon, lat))
}

fn parse_coordinate(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Registrations that passed cleaning.
///
/// Holds the original columns plus non-null `Longitude` and `Latitude`.
#[derive(Debug, Clone)]
pub struct CleanRegistrations {
    df: DataFrame,
    dropped: usize,
}

impl CleanRegistrations {
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// Rows removed by cleaning.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// `(longitude, latitude)` for every record, in row order.
    pub fn coordinates(&self) -> Result<Vec<(f64, f64)>, ProcessorError> {
        let lon = self.df.column(LONGITUDE_COL)?.f64()?;
        let lat = self.df.column(LATITUDE_COL)?.f64()?;

        Ok(lon
            .into_iter()
            .zip(lat.into_iter())
            .filter_map(|(x, y)| Some((x?, y?)))
            .collect())
    }

    /// Non-null electric ranges.
    pub fn electric_ranges(&self) -> Result<Vec<f64>, ProcessorError> {
        let ranges = self.df.column(RANGE_COL)?.cast(&DataType::Float64)?;
        Ok(ranges.f64()?.into_iter().flatten().collect())
    }
}

/// Cleans raw registration frames.
pub struct RecordParser;

impl RecordParser {
    /// Add nullable `Longitude`/`Latitude` columns parsed from the location string.
    pub fn with_coordinates(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let location = df.column(LOCATION_COL)?.cast(&DataType::String)?;
        let location = location.str()?;

        let (lons, lats): (Vec<Option<f64>>, Vec<Option<f64>>) = location
            .into_iter()
            .map(|raw| match raw.and_then(parse_location) {
                Some((lon, lat)) => (Some(lon), Some(lat)),
                None => (None, None),
            })
            .unzip();

        let mut out = df.clone();
        out.with_column(Column::new(LONGITUDE_COL.into(), lons))?;
        out.with_column(Column::new(LATITUDE_COL.into(), lats))?;
        Ok(out)
    }

    /// Keep only rows where every required field is present.
    pub fn drop_incomplete(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let predicate = REQUIRED_FIELDS
            .iter()
            .fold(lit(true), |acc, name| acc.and(col(*name).is_not_null()));

        let filtered = df.clone().lazy().filter(predicate).collect()?;
        Ok(filtered)
    }

    /// Parse coordinates, then drop incomplete rows.
    pub fn clean(df: &DataFrame) -> Result<CleanRegistrations, ProcessorError> {
        let parsed = Self::with_coordinates(df)?;
        let cleaned = Self::drop_incomplete(&parsed)?;
        let dropped = df.height() - cleaned.height();

        info!(
            kept = cleaned.height(),
            dropped,
            "Cleaned registration records"
        );

        Ok(CleanRegistrations {
            df: cleaned,
            dropped,
        })
    }
}
