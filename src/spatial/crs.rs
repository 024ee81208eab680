//! Coordinate reference systems supported by the spatial join.

use geo::{Coord, MapCoords};
use serde::Serialize;
use std::f64::consts::PI;
use std::fmt;

/// WGS84 semi-major axis, used by spherical Web Mercator.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Names ESRI and EPSG WKT use for spherical Web Mercator.
const WEB_MERCATOR_MARKERS: [&str; 5] = [
    "PSEUDO-MERCATOR",
    "PSEUDO_MERCATOR",
    "MERCATOR_AUXILIARY_SPHERE",
    "POPULAR_VISUALISATION",
    "WEB_MERCATOR",
];

/// True when the WKT root is a projected coordinate system.
pub fn is_projected_wkt(wkt: &str) -> bool {
    let root = wkt.trim_start().to_ascii_uppercase();
    root.starts_with("PROJCS") || root.starts_with("PROJCRS")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Crs {
    /// EPSG:4326, longitude/latitude on WGS84
    Wgs84,
    /// EPSG:4269, longitude/latitude on NAD83 (TIGER/Line default)
    Nad83,
    /// EPSG:3857, spherical Web Mercator metres
    WebMercator,
}

impl Crs {
    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::Nad83 => 4269,
            Crs::WebMercator => 3857,
        }
    }

    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(Crs::Wgs84),
            4269 => Some(Crs::Nad83),
            3857 | 900913 => Some(Crs::WebMercator),
            _ => None,
        }
    }

    /// Parse an `EPSG:<code>` string.
    pub fn from_code(code: &str) -> Option<Self> {
        let digits = code.trim().strip_prefix("EPSG:").unwrap_or(code.trim());
        Self::from_epsg(digits.parse().ok()?)
    }

    /// Identify the CRS described by a shapefile `.prj` WKT string.
    ///
    /// Projected systems other than Web Mercator (UTM, state plane, ...)
    /// are not recognised, even when their datum is NAD83 or WGS84.
    pub fn from_prj(wkt: &str) -> Option<Self> {
        let upper = wkt.to_ascii_uppercase();
        if WEB_MERCATOR_MARKERS.iter().any(|m| upper.contains(m)) {
            Some(Crs::WebMercator)
        } else if is_projected_wkt(wkt) {
            None
        } else if upper.contains("NORTH_AMERICAN_1983") || upper.contains("NAD83") {
            Some(Crs::Nad83)
        } else if upper.contains("WGS_1984") || upper.contains("WGS 84") {
            Some(Crs::Wgs84)
        } else {
            None
        }
    }

    pub fn is_geographic(&self) -> bool {
        !matches!(self, Crs::WebMercator)
    }

    // NAD83 and WGS84 differ by about a metre; the conversion is the identity.
    fn unproject(self, c: Coord<f64>) -> Coord<f64> {
        match self {
            Crs::Wgs84 | Crs::Nad83 => c,
            Crs::WebMercator => Coord {
                x: (c.x / EARTH_RADIUS_M).to_degrees(),
                y: (2.0 * (c.y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees(),
            },
        }
    }

    fn project(self, c: Coord<f64>) -> Coord<f64> {
        match self {
            Crs::Wgs84 | Crs::Nad83 => c,
            Crs::WebMercator => Coord {
                x: EARTH_RADIUS_M * c.x.to_radians(),
                y: EARTH_RADIUS_M * (PI / 4.0 + c.y.to_radians() / 2.0).tan().ln(),
            },
        }
    }

    /// Convert a single coordinate from `self` into `target`.
    pub fn convert(self, c: Coord<f64>, target: Crs) -> Coord<f64> {
        if self == target {
            return c;
        }
        target.project(self.unproject(c))
    }

    /// Reproject any geometry from `self` into `target`.
    pub fn reproject<G>(self, geometry: &G, target: Crs) -> G::Output
    where
        G: MapCoords<f64, f64>,
    {
        geometry.map_coords(move |c| self.convert(c, target))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;

    #[test]
    fn test_display_and_parse_codes() {
        assert_eq!(Crs::Wgs84.to_string(), "EPSG:4326");
        assert_eq!(Crs::from_code("EPSG:4269"), Some(Crs::Nad83));
        assert_eq!(Crs::from_code("3857"), Some(Crs::WebMercator));
        assert_eq!(Crs::from_code("EPSG:2927"), None);
    }

    #[test]
    fn test_prj_detection() {
        let tiger = r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137,298.257222101]]]"#;
        assert_eq!(Crs::from_prj(tiger), Some(Crs::Nad83));
        assert_eq!(
            Crs::from_prj(r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984"]]"#),
            Some(Crs::Wgs84)
        );
        assert_eq!(Crs::from_prj("LOCAL_CS[\"unknown\"]"), None);
    }

    const UTM_10N_PRJ: &str = r#"PROJCS["NAD_1983_UTM_Zone_10N",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-123.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

    #[test]
    fn test_prj_web_mercator_only_for_web_mercator() {
        let esri = r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]],PROJECTION["Mercator_Auxiliary_Sphere"],UNIT["Meter",1.0]]"#;
        let epsg = r#"PROJCS["WGS 84 / Pseudo-Mercator",GEOGCS["WGS 84",DATUM["WGS_1984"]],PROJECTION["Mercator_1SP"],EXTENSION["PROJ4","+proj=merc +a=6378137"]]"#;

        assert_eq!(Crs::from_prj(esri), Some(Crs::WebMercator));
        assert_eq!(Crs::from_prj(epsg), Some(Crs::WebMercator));
        assert_eq!(Crs::from_prj(UTM_10N_PRJ), None);
        assert!(is_projected_wkt(UTM_10N_PRJ));
        assert!(!is_projected_wkt(r#"GEOGCS["GCS_WGS_1984"]"#));
    }

    #[test]
    fn test_web_mercator_round_trip() {
        let seattle = Coord { x: -122.33, y: 47.61 };
        let projected = Crs::Wgs84.convert(seattle, Crs::WebMercator);
        let back = Crs::WebMercator.convert(projected, Crs::Wgs84);

        assert!((projected.x - -13_617_713.3).abs() < 10.0);
        assert!((back.x - seattle.x).abs() < 1e-9);
        assert!((back.y - seattle.y).abs() < 1e-9);
    }

    #[test]
    fn test_geographic_datums_are_identity() {
        let p = Point::new(-120.5, 46.6);
        let out = Crs::Nad83.reproject(&p, Crs::Wgs84);

        assert_eq!(out, p);
    }
}
