pub mod data_store;
pub mod day_file_index;
pub mod integrity_checker;
pub mod measurement_store;

pub use data_store::DataStore;
pub use day_file_index::{DayFileIndex, ScanPolicy, SkippedEntry};
pub use integrity_checker::{IntegrityChecker, IntegrityReport, TableStatistics, Violation, ViolationType};
pub use measurement_store::MeasurementStore;
