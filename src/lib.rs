//! EV Atlas - Electric Vehicle Registration Analysis
//!
//! Loads EV registration records, geocodes them from their packed location
//! strings, counts registrations by category and by county, and renders
//! static charts plus a county choropleth for one U.S. state.

pub mod charts;
pub mod config;
pub mod data;
pub mod pipeline;
pub mod spatial;
pub mod stats;
