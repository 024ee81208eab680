//! Run configuration loaded from TOML, with CLI overrides applied on top.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    pub registrations: PathBuf,
    pub boundaries: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            registrations: PathBuf::from("Electric_Vehicle_Population_Data.csv"),
            boundaries: PathBuf::from("shapefiles/tl_2021_us_county.shp"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// State name, postal abbreviation, or FIPS code
    pub state: String,
    pub top_makes: usize,
    pub top_counties: usize,
    pub annotate_counties: usize,
    pub range_bins: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            state: "Washington".to_string(),
            top_makes: 10,
            top_counties: 10,
            annotate_counties: 5,
            range_bins: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub map_width: u32,
    pub map_height: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            width: 1000,
            height: 600,
            map_width: 1200,
            map_height: 800,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn chart_size(&self) -> (u32, u32) {
        (self.output.width, self.output.height)
    }

    pub fn map_size(&self) -> (u32, u32) {
        (self.output.map_width, self.output.map_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.analysis.state, "Washington");
        assert_eq!(config.analysis.range_bins, 30);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            boundaries = "/data/tl_2021_us_county.shp"

            [analysis]
            state = "OR"
            "#,
        )
        .unwrap();

        assert_eq!(config.input.boundaries, PathBuf::from("/data/tl_2021_us_county.shp"));
        assert_eq!(
            config.input.registrations,
            PathBuf::from("Electric_Vehicle_Population_Data.csv")
        );
        assert_eq!(config.analysis.state, "OR");
        assert_eq!(config.analysis.top_makes, 10);
        assert_eq!(config.map_size(), (1200, 800));
    }

    #[test]
    fn test_bad_toml_is_error() {
        assert!(matches!(
            AppConfig::from_toml("[analysis]\ntop_makes = \"ten\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = AppConfig::load_from_file(Path::new("/no/such/ev_atlas.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
