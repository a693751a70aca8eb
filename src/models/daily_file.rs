use crate::error::{ProcessingError, Result};
use crate::models::{wavelengths, AerosolType, Coordinates, Wavelength, WeatherField};
use crate::utils::time::{format_timestamp, Timestamp};
use std::collections::BTreeMap;

/// Scalar values from the metadata block
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    /// Instrument code as declared in the file (e.g. BTCN02)
    pub site: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// Any other `Key: value` lines, kept verbatim
    pub extra: BTreeMap<String, String>,
}

impl FileHeader {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.longitude, self.latitude, self.altitude)
    }
}

/// Contents of one daily file, decoded but not yet sanitized
#[derive(Debug, Clone, PartialEq)]
pub struct DailyFile {
    pub header: FileHeader,
    pub times: Vec<Timestamp>,
    pub weather: BTreeMap<WeatherField, Vec<f64>>,
    pub aerosol_types: Vec<AerosolType>,
    pub weather_errors: BTreeMap<WeatherField, Vec<f64>>,
    pub spectral: BTreeMap<Wavelength, Vec<f64>>,
    pub spectral_errors: BTreeMap<Wavelength, Vec<f64>>,
}

impl DailyFile {
    /// Number of acquisitions (timestamps) in the file
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Check that acquisition times are unique, every series matches the timestamp
    /// count and the spectral tables cover the full wavelength grid.
    pub fn validate(&self) -> Result<()> {
        let expected = self.times.len();

        let mut times = self.times.clone();
        times.sort_unstable();
        if let Some(pair) = times.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ProcessingError::InvalidFormat(format!(
                "Duplicate acquisition time {}",
                format_timestamp(&pair[0])
            )));
        }

        check_length("Type", self.aerosol_types.len(), expected)?;

        for (label, table) in [("weather", &self.weather), ("weather error", &self.weather_errors)] {
            for field in WeatherField::ALL {
                let values = table.get(&field).ok_or_else(|| {
                    ProcessingError::InvalidFormat(format!("Missing {} field {}", label, field))
                })?;
                check_length(field.header(), values.len(), expected)?;
            }
        }

        for (label, table) in [("spectral", &self.spectral), ("spectral error", &self.spectral_errors)] {
            if let Some(missing) = wavelengths().find(|wl| !table.contains_key(wl)) {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Missing {} row for wavelength {}",
                    label, missing
                )));
            }
            if table.len() != wavelengths().count() {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Unexpected wavelength rows in {} table",
                    label
                )));
            }
            for (wavelength, values) in table {
                check_length(&wavelength.to_string(), values.len(), expected)?;
            }
        }

        Ok(())
    }
}

fn check_length(header: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(ProcessingError::InvalidFormat(format!(
            "Row {} has {} values, expected {}",
            header, actual, expected
        )));
    }
    Ok(())
}
