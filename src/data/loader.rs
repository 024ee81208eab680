//! Registration Loader Module
//! Handles CSV file loading and column validation using Polars.

use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const LOCATION_COL: &str = "Vehicle Location";
pub const COUNTY_COL: &str = "County";
pub const CITY_COL: &str = "City";
pub const EV_TYPE_COL: &str = "Electric Vehicle Type";
pub const MAKE_COL: &str = "Make";
pub const MODEL_YEAR_COL: &str = "Model Year";
pub const RANGE_COL: &str = "Electric Range";

/// Columns every registration file must carry.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    LOCATION_COL,
    COUNTY_COL,
    CITY_COL,
    EV_TYPE_COL,
    MAKE_COL,
    MODEL_YEAR_COL,
    RANGE_COL,
];

/// Rows sampled for schema inference.
const INFER_SCHEMA_ROWS: usize = 10_000;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Registration file not found: {0}")]
    NotFound(PathBuf),
    #[error("Required column '{0}' is missing from the registration file")]
    MissingColumn(String),
}

/// Loads EV registration records with Polars.
pub struct RegistrationLoader {
    path: PathBuf,
}

impl RegistrationLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registration CSV and check it has the required columns.
    pub fn load(&self) -> Result<DataFrame, LoaderError> {
        if !self.path.is_file() {
            return Err(LoaderError::NotFound(self.path.clone()));
        }

        // Use lazy evaluation for memory efficiency, then collect
        let df = LazyCsvReader::new(&self.path)
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;

        info!(path = %self.path.display(), "Loaded registration file");
        Self::validate(df)
    }

    /// Load registrations from an in-memory CSV document.
    pub fn load_from_bytes(bytes: impl Into<Vec<u8>>) -> Result<DataFrame, LoaderError> {
        let df = CsvReadOptions::default()
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .with_ignore_errors(true)
            .into_reader_with_file_handle(Cursor::new(bytes.into()))
            .finish()?;

        Self::validate(df)
    }

    fn validate(df: DataFrame) -> Result<DataFrame, LoaderError> {
        if let Some(missing) = REQUIRED_COLUMNS
            .iter()
            .find(|name| df.column(name).is_err())
        {
            return Err(LoaderError::MissingColumn(missing.to_string()));
        }

        log_overview(&df);
        Ok(df)
    }
}

/// Dataset overview: shape and columns at info, schema and head at debug.
fn log_overview(df: &DataFrame) {
    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    info!(rows = df.height(), columns = ?columns, "Dataset overview");

    for column in df.get_columns() {
        debug!(
            column = %column.name(),
            dtype = %column.dtype(),
            nulls = column.null_count(),
            "Column info"
        );
    }
    debug!("Head:\n{}", df.head(Some(5)));
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "VIN,County,City,State,Model Year,Make,Electric Vehicle Type,Electric Range,Vehicle Location\n";

    #[test]
    fn test_load_from_bytes_reads_rows() {
        let csv = format!(
            "{HEADER}1,King,Seattle,WA,2020,TESLA,Battery Electric Vehicle (BEV),291,POINT (-122.33 47.61)\n\
             2,Pierce,Tacoma,WA,2018,NISSAN,Battery Electric Vehicle (BEV),151,POINT (-122.44 47.25)\n"
        );
        let df = RegistrationLoader::load_from_bytes(csv).unwrap();

        assert_eq!(df.height(), 2);
        assert!(df.column(LOCATION_COL).is_ok());
    }

    #[test]
    fn test_missing_required_column_is_error() {
        let csv = "County,City\nKing,Seattle\n";
        let err = RegistrationLoader::load_from_bytes(csv).unwrap_err();

        assert!(matches!(err, LoaderError::MissingColumn(ref c) if c == LOCATION_COL));
    }

    #[test]
    fn test_missing_file_is_error() {
        let loader = RegistrationLoader::new("/definitely/not/here.csv");
        assert!(matches!(loader.load(), Err(LoaderError::NotFound(_))));
    }
}
