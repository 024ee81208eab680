//! Data module - registration loading and cleaning

pub mod loader;
pub mod processor;

pub use loader::{LoaderError, RegistrationLoader};
pub use processor::{parse_location, CleanRegistrations, ProcessorError, RecordParser};
