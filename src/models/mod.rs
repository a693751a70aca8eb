pub mod daily_file;
pub mod fields;
pub mod file_metadata;
pub mod measurements;
pub mod site;
pub mod table;

pub use daily_file::{DailyFile, FileHeader};
pub use fields::{is_grid_wavelength, wavelengths, AerosolType, Measurement, Wavelength, WeatherField};
pub use file_metadata::{DailyFileHandle, FileMetadata, Stage};
pub use measurements::{Series, SiteMeasurements, SpectralTable, WeatherErrorTable, WeatherTable};
pub use site::{Coordinates, SiteCode, SiteMetadata};
pub use table::{CellValue, ConflictPolicy, TimeTable};
