pub mod cli;
pub mod error;
pub mod models;
pub mod processors;
pub mod readers;
pub mod settings;
pub mod utils;
pub mod writers;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ProcessingError, Result};
pub use models::{FileMetadata, SiteMeasurements, SiteMetadata};
pub use processors::{DataStore, DayFileIndex, MeasurementStore};
pub use settings::Settings;
