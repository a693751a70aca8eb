use crate::error::{ProcessingError, Result};
use crate::utils::constants::{MAX_WAVELENGTH, MIN_WAVELENGTH, WAVELENGTH_STEP};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Spectral table column key, in nanometres
pub type Wavelength = u16;

/// The fixed wavelength grid 400, 410, ..., 2500 nm
pub fn wavelengths() -> impl Iterator<Item = Wavelength> {
    (MIN_WAVELENGTH..=MAX_WAVELENGTH).step_by(WAVELENGTH_STEP as usize)
}

pub fn is_grid_wavelength(wavelength: Wavelength) -> bool {
    (MIN_WAVELENGTH..=MAX_WAVELENGTH).contains(&wavelength)
        && (wavelength - MIN_WAVELENGTH) % WAVELENGTH_STEP == 0
}

/// Numeric weather fields carried by both the data and the error blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WeatherField {
    Pressure,    // P
    Temperature, // T
    WaterVapor,  // WV
    Ozone,       // O3
    Aod,         // AOD
    Angstrom,    // Ang
}

impl WeatherField {
    pub const ALL: [WeatherField; 6] = [
        WeatherField::Pressure,
        WeatherField::Temperature,
        WeatherField::WaterVapor,
        WeatherField::Ozone,
        WeatherField::Aod,
        WeatherField::Angstrom,
    ];

    pub fn from_header(header: &str) -> Option<Self> {
        match header {
            "P" => Some(WeatherField::Pressure),
            "T" => Some(WeatherField::Temperature),
            "WV" => Some(WeatherField::WaterVapor),
            "O3" => Some(WeatherField::Ozone),
            "AOD" => Some(WeatherField::Aod),
            "Ang" => Some(WeatherField::Angstrom),
            _ => None,
        }
    }

    pub fn header(&self) -> &'static str {
        match self {
            WeatherField::Pressure => "P",
            WeatherField::Temperature => "T",
            WeatherField::WaterVapor => "WV",
            WeatherField::Ozone => "O3",
            WeatherField::Aod => "AOD",
            WeatherField::Angstrom => "Ang",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            WeatherField::Pressure => "Surface atmospheric pressure",
            WeatherField::Temperature => "Surface temperature",
            WeatherField::WaterVapor => "Water vapor",
            WeatherField::Ozone => "Ozone column",
            WeatherField::Aod => "Aerosol optical depth at 550 nm",
            WeatherField::Angstrom => "Aerosol Angstrom coefficient",
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            WeatherField::Pressure => "mb",
            WeatherField::Temperature => "K",
            WeatherField::WaterVapor => "g/cm²",
            WeatherField::Ozone => "DU",
            WeatherField::Aod | WeatherField::Angstrom => "",
        }
    }
}

impl fmt::Display for WeatherField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header())
    }
}

/// Aerosol composition category from the `Type:` row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AerosolType {
    Rural,
    Continental,
    Desert,
    Marine,
}

impl AerosolType {
    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "R" => Ok(AerosolType::Rural),
            "C" => Ok(AerosolType::Continental),
            "D" => Ok(AerosolType::Desert),
            "M" => Ok(AerosolType::Marine),
            other => Err(ProcessingError::InvalidFormat(format!(
                "Unexpected aerosol type: '{}'",
                other
            ))),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AerosolType::Rural => "R",
            AerosolType::Continental => "C",
            AerosolType::Desert => "D",
            AerosolType::Marine => "M",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AerosolType::Rural => "Rural",
            AerosolType::Continental => "Continental",
            AerosolType::Desert => "Desert",
            AerosolType::Marine => "Marine",
        }
    }
}

impl fmt::Display for AerosolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A plottable quantity: one weather field, or a reflectance spectrum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Measurement {
    Weather(WeatherField),
    SurfaceReflectance,
    ToaReflectance,
}

impl Measurement {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "sr" => Some(Measurement::SurfaceReflectance),
            "toa" => Some(Measurement::ToaReflectance),
            other => WeatherField::from_header(other).map(Measurement::Weather),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Measurement::Weather(field) => field.header(),
            Measurement::SurfaceReflectance => "sr",
            Measurement::ToaReflectance => "toa",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Measurement::Weather(field) => field.display_name(),
            Measurement::SurfaceReflectance => "Surface Reflectance",
            Measurement::ToaReflectance => "Top Of Atmosphere Reflectance",
        }
    }

    pub fn is_spectral(&self) -> bool {
        !matches!(self, Measurement::Weather(_))
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wavelength_grid() {
        let grid: Vec<Wavelength> = wavelengths().collect();
        assert_eq!(grid.len(), 211);
        assert_eq!(grid.first(), Some(&400));
        assert_eq!(grid.last(), Some(&2500));
        assert!(is_grid_wavelength(550));
        assert!(!is_grid_wavelength(555));
        assert!(!is_grid_wavelength(390));
        assert!(!is_grid_wavelength(2510));
    }

    #[test]
    fn test_weather_field_headers() {
        for field in WeatherField::ALL {
            assert_eq!(WeatherField::from_header(field.header()), Some(field));
        }
        assert_eq!(WeatherField::from_header("Type"), None);
        assert_eq!(WeatherField::Ozone.units(), "DU");
        assert_eq!(WeatherField::Aod.to_string(), "AOD");
    }

    #[test]
    fn test_aerosol_type_codes() {
        assert_eq!(AerosolType::from_code("D").unwrap(), AerosolType::Desert);
        assert_eq!(AerosolType::from_code("M").unwrap(), AerosolType::Marine);
        assert_eq!(AerosolType::from_code("C").unwrap().code(), "C");
        assert_eq!(AerosolType::from_code("R").unwrap().display_name(), "Rural");

        let err = AerosolType::from_code("X").unwrap_err();
        assert!(err.is_format_error());

        // codes must match exactly
        assert!(AerosolType::from_code(" D").is_err());
        assert!(AerosolType::from_code("d").is_err());
    }

    #[test]
    fn test_measurement_parse() {
        assert_eq!(Measurement::parse("sr"), Some(Measurement::SurfaceReflectance));
        assert_eq!(Measurement::parse("toa"), Some(Measurement::ToaReflectance));
        assert_eq!(
            Measurement::parse("WV"),
            Some(Measurement::Weather(WeatherField::WaterVapor))
        );
        assert_eq!(Measurement::parse("Type"), None);
        assert!(Measurement::ToaReflectance.is_spectral());
        assert!(!Measurement::Weather(WeatherField::Pressure).is_spectral());
    }
}
