use ev_atlas::config::AnalysisConfig;
use ev_atlas::data::RegistrationLoader;
use ev_atlas::pipeline::{analyze, write_summary};
use ev_atlas::spatial::{BoundarySet, CountyPolygon, Crs, InMemorySource};
use geo::{polygon, MultiPolygon};

const CSV: &str = "\
VIN (1-10),County,City,State,Postal Code,Model Year,Make,Model,Electric Vehicle Type,Electric Range,Vehicle Location
5YJ3E1EA1J,King,Seattle,WA,98101,2018,TESLA,MODEL 3,Battery Electric Vehicle (BEV),215,POINT (-122.33 47.61)
1N4AZ0CP5D,King,Bellevue,WA,98004,2013,NISSAN,LEAF,Battery Electric Vehicle (BEV),75,POINT (-122.20 47.61)
KNDCC3LG7L,King,Kent,WA,98032,2020,KIA,NIRO,Plug-in Hybrid Electric Vehicle (PHEV),26,POINT (-122.23 47.38)
5YJYGDEE0L,Kitsap,Poulsbo,WA,98370,2020,TESLA,MODEL Y,Battery Electric Vehicle (BEV),291,INVALID
WBY8P2C05L,,Olympia,WA,98501,2020,BMW,I3,Battery Electric Vehicle (BEV),153,POINT (-122.90 47.04)
1G1FX6S00H,Multnomah,Portland,OR,97201,2017,CHEVROLET,BOLT EV,Battery Electric Vehicle (BEV),238,POINT (-122.68 45.52)
";

fn square(state: &str, name: &str, x0: f64, y0: f64, w: f64, h: f64) -> CountyPolygon {
    CountyPolygon {
        state_fips: state.to_string(),
        county_fips: None,
        name: name.to_string(),
        geometry: MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + w, y: y0),
            (x: x0 + w, y: y0 + h),
            (x: x0, y: y0 + h),
            (x: x0, y: y0),
        ]]),
    }
}

fn boundaries() -> InMemorySource {
    InMemorySource::new(BoundarySet::new(
        Crs::Nad83,
        vec![
            square("53", "King", -122.6, 47.1, 1.0, 0.7),
            square("53", "Kitsap", -123.0, 47.3, 0.4, 0.6),
            square("53", "Thurston", -123.2, 46.7, 0.6, 0.4),
            square("41", "Multnomah", -123.0, 45.3, 1.0, 0.5),
        ],
    ))
}

#[test]
fn test_full_pipeline() {
    let raw = RegistrationLoader::load_from_bytes(CSV).expect("Failed to load CSV");
    let analysis = analyze(&raw, &boundaries(), &AnalysisConfig::default()).expect("Analysis failed");

    // INVALID location and missing county are dropped.
    assert_eq!(analysis.registrations, 4);
    assert_eq!(analysis.dropped, 2);

    assert_eq!(analysis.state.fips, "53");
    assert_eq!(analysis.top_counties.get("King"), Some(3));
    assert_eq!(analysis.top_counties.get("Kitsap"), None);
    assert_eq!(analysis.top_makes.get("BMW"), None);
    assert_eq!(analysis.ev_types.total(), 4);
    assert_eq!(
        analysis.model_years.labels(),
        vec!["2013".to_string(), "2017".to_string(), "2018".to_string(), "2020".to_string()]
    );
    assert_eq!(analysis.range_histogram.total(), 4);
    assert!(analysis.range_curve.is_some());

    // Every Washington county appears once; the Oregon point is unmatched.
    assert_eq!(analysis.join.counties.len(), 3);
    assert_eq!(analysis.join.get("King"), Some(3));
    assert_eq!(analysis.join.get("Kitsap"), Some(0));
    assert_eq!(analysis.join.get("Thurston"), Some(0));
    assert_eq!(analysis.join.matched, 3);
    assert_eq!(analysis.join.unmatched, 1);
    assert_eq!(analysis.join.get("Thurston").map(ev_atlas::spatial::log_scale), Some(0.0));
}

#[test]
fn test_state_by_abbreviation() {
    let raw = RegistrationLoader::load_from_bytes(CSV).unwrap();
    let config = AnalysisConfig {
        state: "or".to_string(),
        ..AnalysisConfig::default()
    };
    let analysis = analyze(&raw, &boundaries(), &config).unwrap();

    assert_eq!(analysis.join.counties.len(), 1);
    assert_eq!(analysis.join.get("Multnomah"), Some(1));
}

#[test]
fn test_unknown_state_fails() {
    let raw = RegistrationLoader::load_from_bytes(CSV).unwrap();
    let config = AnalysisConfig {
        state: "Atlantis".to_string(),
        ..AnalysisConfig::default()
    };

    assert!(analyze(&raw, &boundaries(), &config).is_err());
}

#[test]
fn test_summary_json() {
    let raw = RegistrationLoader::load_from_bytes(CSV).unwrap();
    let analysis = analyze(&raw, &boundaries(), &AnalysisConfig::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("summary.json");
    write_summary(&analysis, &path).unwrap();

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["registrations"], 4);
    assert_eq!(json["state"]["fips"], "53");
    let counties = json["county_counts"].as_array().unwrap();
    assert_eq!(counties.len(), 3);
    assert!(counties.iter().any(|c| c["name"] == "King" && c["count"] == 3));
}

#[test]
fn test_render_smoke_writes_png() {
    use ev_atlas::charts::renderer::render_with;
    use plotters::prelude::*;

    let chart = render_with((64, 48), |root| {
        root.fill(&RED)?;
        Ok(())
    })
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("smoke.png");
    chart.save(&path).unwrap();

    let decoded = image::open(&path).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (64, 48));
    assert_eq!(decoded.get_pixel(10, 10).0, [255, 0, 0]);
}
