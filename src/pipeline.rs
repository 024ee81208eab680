//! Analysis pipeline: load → clean → aggregate → join → render.
//!
//! Every stage takes its inputs explicitly and returns a new value, so the
//! analysis can run without touching the filesystem and rendering is a
//! separate step over the finished [`Analysis`].

use crate::charts::palette::{LIGHT_GREEN, ORANGE, SKY_BLUE};
use crate::charts::{BarStyle, ChartLabels, ChoroplethRenderer, MapLabels, RenderError, StaticChartRenderer};
use crate::config::{AnalysisConfig, AppConfig};
use crate::data::loader::{COUNTY_COL, EV_TYPE_COL, MAKE_COL, MODEL_YEAR_COL};
use crate::data::{RecordParser, RegistrationLoader};
use crate::spatial::{source_for_path, BoundarySource, CountySummary, JoinOutcome, PointCollection, SpatialJoiner, State};
use crate::stats::{AggregationResult, Aggregator, Histogram, Kde};
use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

pub const EV_TYPE_FILE: &str = "ev_type_distribution.png";
pub const MODEL_YEAR_FILE: &str = "ev_model_year.png";
pub const MAKE_FILE: &str = "ev_make_counts.png";
pub const RANGE_FILE: &str = "electric_range.png";
pub const COUNTY_FILE: &str = "county_counts.png";
pub const MAP_FILE: &str = "ev_map.png";

const KDE_POINTS: usize = 200;

/// Everything computed from one registration file and one boundary set.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub state: State,
    pub registrations: usize,
    pub dropped: usize,
    pub ev_types: AggregationResult,
    pub model_years: AggregationResult,
    pub top_makes: AggregationResult,
    pub top_counties: AggregationResult,
    pub range_histogram: Histogram,
    pub range_curve: Option<Vec<(f64, f64)>>,
    pub join: JoinOutcome,
}

/// JSON view of an [`Analysis`].
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub state: State,
    pub registrations: usize,
    pub dropped: usize,
    pub ev_types: AggregationResult,
    pub model_years: AggregationResult,
    pub top_makes: AggregationResult,
    pub top_counties: AggregationResult,
    pub range_histogram: Histogram,
    pub joined_points: usize,
    pub unjoined_points: usize,
    pub county_counts: Vec<CountySummary>,
}

impl Analysis {
    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            state: self.state,
            registrations: self.registrations,
            dropped: self.dropped,
            ev_types: self.ev_types.clone(),
            model_years: self.model_years.clone(),
            top_makes: self.top_makes.clone(),
            top_counties: self.top_counties.clone(),
            range_histogram: self.range_histogram.clone(),
            joined_points: self.join.matched,
            unjoined_points: self.join.unmatched,
            county_counts: self.join.summaries(),
        }
    }
}

/// Run every non-rendering stage over a raw registration frame.
pub fn analyze(
    raw: &DataFrame,
    boundaries: &dyn BoundarySource,
    config: &AnalysisConfig,
) -> Result<Analysis> {
    let state = State::lookup(&config.state)?;

    let clean = RecordParser::clean(raw)?;
    let df = clean.dataframe();

    let ev_types = Aggregator::value_counts(df, EV_TYPE_COL)?;
    let model_years = Aggregator::counts_in_natural_order(df, MODEL_YEAR_COL)?;
    let top_makes = Aggregator::value_counts(df, MAKE_COL)?.top(config.top_makes);
    let top_counties = Aggregator::value_counts(df, COUNTY_COL)?.top(config.top_counties);

    let ranges = clean.electric_ranges()?;
    let range_histogram = Histogram::from_values(&ranges, config.range_bins);
    let range_curve = Kde::gaussian(&ranges).map(|kde| kde.curve_for(&range_histogram, KDE_POINTS));

    let points = PointCollection::from_registrations(&clean)?;
    info!(points = points.len(), crs = %points.crs, "Built registration points");

    let boundary_set = boundaries
        .load()
        .with_context(|| format!("Failed to load boundaries from {}", boundaries.describe()))?;
    let join = SpatialJoiner::new(state.fips).join(&points, boundary_set)?;

    Ok(Analysis {
        state,
        registrations: clean.height(),
        dropped: clean.dropped(),
        ev_types,
        model_years,
        top_makes,
        top_counties,
        range_histogram,
        range_curve,
        join,
    })
}

/// Render all charts into `config.output.dir`, returning the written paths.
pub fn render(analysis: &Analysis, config: &AppConfig) -> Result<Vec<PathBuf>, RenderError> {
    let dir = &config.output.dir;
    let size = config.chart_size();
    let mut written = Vec::new();

    let mut save = |name: &str, image: crate::charts::ChartImage| -> Result<(), RenderError> {
        let path = dir.join(name);
        image.save(&path)?;
        info!(path = %path.display(), "Saved chart");
        written.push(path);
        Ok(())
    };

    save(
        EV_TYPE_FILE,
        StaticChartRenderer::bar_chart(
            &analysis.ev_types,
            &ChartLabels::new("Distribution of EV Types", "Electric Vehicle Type", "Count"),
            BarStyle::Vertical(SKY_BLUE),
            size,
        )?,
    )?;

    save(
        MODEL_YEAR_FILE,
        StaticChartRenderer::bar_chart(
            &analysis.model_years,
            &ChartLabels::new("EV Registrations by Model Year", "Model Year", "Count"),
            BarStyle::Vertical(LIGHT_GREEN),
            size,
        )?,
    )?;

    save(
        MAKE_FILE,
        StaticChartRenderer::bar_chart(
            &analysis.top_makes,
            &ChartLabels::new(
                &format!("Top {} EV Makes by Registration Count", analysis.top_makes.len()),
                "Number of Registrations",
                "Make",
            ),
            BarStyle::HorizontalViridis,
            size,
        )?,
    )?;

    save(
        RANGE_FILE,
        StaticChartRenderer::histogram(
            &analysis.range_histogram,
            analysis.range_curve.as_deref(),
            &ChartLabels::new("Distribution of Electric Range", "Electric Range (miles)", "Frequency"),
            ORANGE,
            size,
        )?,
    )?;

    save(
        COUNTY_FILE,
        StaticChartRenderer::bar_chart(
            &analysis.top_counties,
            &ChartLabels::new(
                &format!("Top {} Counties by EV Registrations", analysis.top_counties.len()),
                "Number of EVs",
                "County",
            ),
            BarStyle::HorizontalViridis,
            size,
        )?,
    )?;

    save(
        MAP_FILE,
        ChoroplethRenderer::render(
            &analysis.join,
            &MapLabels {
                title: format!("Distribution of EV Registrations Across {} State", analysis.state.name),
                legend: "Log(Number of EVs + 1)".to_string(),
            },
            config.analysis.annotate_counties,
            config.map_size(),
        )?,
    )?;

    Ok(written)
}

/// Write the analysis summary as pretty JSON.
pub fn write_summary(analysis: &Analysis, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create summary file {:?}", path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &analysis.summary())
        .with_context(|| format!("Failed to write summary to {:?}", path))?;
    info!(path = %path.display(), "Wrote analysis summary");
    Ok(())
}

/// Load, analyze, and render with the given configuration.
pub fn run(config: &AppConfig) -> Result<(Analysis, Vec<PathBuf>)> {
    let raw = RegistrationLoader::new(&config.input.registrations)
        .load()
        .with_context(|| format!("Failed to load registrations from {:?}", config.input.registrations))?;

    let boundaries = source_for_path(&config.input.boundaries)?;
    let analysis = analyze(&raw, boundaries.as_ref(), &config.analysis)?;

    fs::create_dir_all(&config.output.dir)
        .with_context(|| format!("Failed to create output directory {:?}", config.output.dir))?;
    let images = render(&analysis, config).context("Failed to render charts")?;

    Ok((analysis, images))
}
