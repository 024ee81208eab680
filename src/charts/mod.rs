//! Charts module - static chart and map rendering

pub mod map;
pub mod palette;
pub mod renderer;

pub use map::{ChoroplethRenderer, MapLabels};
pub use renderer::{BarStyle, ChartImage, ChartLabels, RenderError, StaticChartRenderer};
