use crate::error::{ProcessingError, Result};
use crate::models::table::{ConflictPolicy, TimeTable};
use crate::models::{
    wavelengths, AerosolType, DailyFile, Measurement, SiteMetadata, Stage, Wavelength, WeatherField,
};
use crate::utils::constants::HEADER_TYPE;
use crate::utils::time::Timestamp;
use serde::Serialize;
use std::collections::BTreeMap;

pub type SpectralTable = TimeTable<Wavelength, f64>;
pub type WeatherErrorTable = TimeTable<WeatherField, f64>;
pub type AerosolTypeTable = TimeTable<&'static str, Option<AerosolType>>;

/// Weather readings plus the categorical aerosol type, on one timestamp axis
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherTable {
    readings: TimeTable<WeatherField, f64>,
    aerosol_types: AerosolTypeTable,
}

impl WeatherTable {
    pub fn empty() -> Self {
        Self {
            readings: TimeTable::empty(WeatherField::ALL),
            aerosol_types: TimeTable::empty([HEADER_TYPE]),
        }
    }

    pub fn new(readings: TimeTable<WeatherField, f64>, aerosol_types: AerosolTypeTable) -> Result<Self> {
        if readings.index() != aerosol_types.index() {
            return Err(ProcessingError::InvalidFormat(
                "Aerosol type row does not match the weather timestamps".to_string(),
            ));
        }
        Ok(Self {
            readings,
            aerosol_types,
        })
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn index(&self) -> &[Timestamp] {
        self.readings.index()
    }

    pub fn readings(&self) -> &TimeTable<WeatherField, f64> {
        &self.readings
    }

    pub fn aerosol_types(&self) -> &AerosolTypeTable {
        &self.aerosol_types
    }

    pub fn column(&self, field: WeatherField) -> Option<&[f64]> {
        self.readings.column(&field)
    }

    pub fn aerosol_type_column(&self) -> Option<&[Option<AerosolType>]> {
        self.aerosol_types.column(&HEADER_TYPE)
    }

    pub fn slice(&self, from: Option<Timestamp>, to: Option<Timestamp>) -> Self {
        Self {
            readings: self.readings.slice(from, to),
            aerosol_types: self.aerosol_types.slice(from, to),
        }
    }

    pub fn union_all<'a, I>(tables: I, policy: ConflictPolicy) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let tables: Vec<&Self> = tables.into_iter().collect();
        Ok(Self {
            readings: TimeTable::union_all(tables.iter().map(|t| &t.readings), policy)?,
            aerosol_types: TimeTable::union_all(tables.iter().map(|t| &t.aerosol_types), policy)?,
        })
    }

    /// Numeric sentinel sanitation; aerosol types are categories and stay untouched
    fn sanitize_sentinels(self) -> Self {
        Self {
            readings: self.readings.sanitize_sentinels(),
            aerosol_types: self.aerosol_types,
        }
    }
}

/// Values of one measurement over time, with the matching uncertainties
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub measurement: Measurement,
    pub wavelength: Option<Wavelength>,
    pub timestamps: Vec<Timestamp>,
    pub values: Vec<f64>,
    /// Aligned to `timestamps`; NaN where no error is recorded
    pub errors: Vec<f64>,
}

type SpectralAccessor = fn(&SiteMeasurements) -> (&SpectralTable, &SpectralTable);

fn surface_tables(m: &SiteMeasurements) -> (&SpectralTable, &SpectralTable) {
    (&m.sr, &m.sr_errors)
}

fn toa_tables(m: &SiteMeasurements) -> (&SpectralTable, &SpectralTable) {
    (&m.toa, &m.toa_errors)
}

const SPECTRAL_ACCESSORS: [(Measurement, SpectralAccessor); 2] = [
    (Measurement::SurfaceReflectance, surface_tables),
    (Measurement::ToaReflectance, toa_tables),
];

/// The merged, queryable measurements of one instrument.
///
/// Six tables (weather, weather errors, surface reflectance and its errors, top of
/// atmosphere reflectance and its errors) plus the site metadata. Every transforming
/// operation returns a new instance.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteMeasurements {
    metadata: SiteMetadata,
    weather: WeatherTable,
    weather_errors: WeatherErrorTable,
    sr: SpectralTable,
    sr_errors: SpectralTable,
    toa: SpectralTable,
    toa_errors: SpectralTable,
}

impl SiteMeasurements {
    /// No rows, with every weather field and wavelength column present
    pub fn empty(metadata: SiteMetadata) -> Self {
        Self {
            metadata,
            weather: WeatherTable::empty(),
            weather_errors: TimeTable::empty(WeatherField::ALL),
            sr: TimeTable::empty(wavelengths()),
            sr_errors: TimeTable::empty(wavelengths()),
            toa: TimeTable::empty(wavelengths()),
            toa_errors: TimeTable::empty(wavelengths()),
        }
    }

    /// Sanitized tables for a single daily file.
    ///
    /// Spectral data is routed to `sr` for input files and to `toa` for output files;
    /// the other pair stays empty.
    pub fn from_daily_file(metadata: SiteMetadata, file: DailyFile, stage: Stage) -> Result<Self> {
        file.validate()?;

        let DailyFile {
            times,
            weather,
            aerosol_types,
            weather_errors,
            spectral,
            spectral_errors,
            ..
        } = file;

        let mut types = BTreeMap::new();
        types.insert(HEADER_TYPE, aerosol_types.into_iter().map(Some).collect());

        let weather = WeatherTable::new(
            TimeTable::from_columns(times.clone(), weather)?,
            TimeTable::from_columns(times.clone(), types)?,
        )?
        .sanitize_sentinels();
        let weather_errors = TimeTable::from_columns(times.clone(), weather_errors)?.sanitize_sentinels();
        let spectral = TimeTable::from_columns(times.clone(), spectral)?.sanitize_sentinels();
        let spectral_errors = TimeTable::from_columns(times, spectral_errors)?.sanitize_sentinels();

        let mut partial = Self::empty(metadata);
        partial.weather = weather;
        partial.weather_errors = weather_errors;
        match stage {
            Stage::Input => {
                partial.sr = spectral;
                partial.sr_errors = spectral_errors;
            }
            Stage::Output => {
                partial.toa = spectral;
                partial.toa_errors = spectral_errors;
            }
        }

        Ok(partial)
    }

    /// Fold partial results into one instance carrying `metadata`.
    ///
    /// The partials' own metadata is not compared; callers validate it before folding.
    pub fn combine(metadata: SiteMetadata, parts: &[SiteMeasurements], policy: ConflictPolicy) -> Result<Self> {
        let base = Self::empty(metadata);
        let all: Vec<&Self> = std::iter::once(&base).chain(parts).collect();

        Ok(Self {
            weather: WeatherTable::union_all(all.iter().map(|m| &m.weather), policy)?,
            weather_errors: TimeTable::union_all(all.iter().map(|m| &m.weather_errors), policy)?,
            sr: TimeTable::union_all(all.iter().map(|m| &m.sr), policy)?,
            sr_errors: TimeTable::union_all(all.iter().map(|m| &m.sr_errors), policy)?,
            toa: TimeTable::union_all(all.iter().map(|m| &m.toa), policy)?,
            toa_errors: TimeTable::union_all(all.iter().map(|m| &m.toa_errors), policy)?,
            metadata: base.metadata,
        })
    }

    pub fn metadata(&self) -> &SiteMetadata {
        &self.metadata
    }

    pub fn weather(&self) -> &WeatherTable {
        &self.weather
    }

    pub fn weather_errors(&self) -> &WeatherErrorTable {
        &self.weather_errors
    }

    pub fn sr(&self) -> &SpectralTable {
        &self.sr
    }

    pub fn sr_errors(&self) -> &SpectralTable {
        &self.sr_errors
    }

    pub fn toa(&self) -> &SpectralTable {
        &self.toa
    }

    pub fn toa_errors(&self) -> &SpectralTable {
        &self.toa_errors
    }

    /// Named numeric spectral tables, in export order
    pub fn spectral_tables(&self) -> [(&'static str, &SpectralTable); 4] {
        [
            ("sr", &self.sr),
            ("sr_errs", &self.sr_errors),
            ("toa", &self.toa),
            ("toa_errs", &self.toa_errors),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.weather.is_empty()
            && self.weather_errors.is_empty()
            && self.spectral_tables().iter().all(|(_, table)| table.is_empty())
    }

    /// Inclusive time slice of every table
    pub fn slice(&self, from: Option<Timestamp>, to: Option<Timestamp>) -> Self {
        Self {
            metadata: self.metadata.clone(),
            weather: self.weather.slice(from, to),
            weather_errors: self.weather_errors.slice(from, to),
            sr: self.sr.slice(from, to),
            sr_errors: self.sr_errors.slice(from, to),
            toa: self.toa.slice(from, to),
            toa_errors: self.toa_errors.slice(from, to),
        }
    }

    /// Union with measurements of the same instrument; conflicting cells are an error
    pub fn merge(&self, other: &Self) -> Result<Self> {
        self.merge_with(other, ConflictPolicy::Reject)
    }

    pub fn merge_with(&self, other: &Self, policy: ConflictPolicy) -> Result<Self> {
        if self.metadata != other.metadata {
            return Err(ProcessingError::Integrity(format!(
                "Cannot merge measurements with different metadata: {:?} vs {:?}",
                self.metadata, other.metadata
            )));
        }

        Self::combine(self.metadata.clone(), &[self.clone(), other.clone()], policy)
    }

    /// Extract one measurement as a time series.
    ///
    /// Spectral measurements need a grid wavelength; weather fields ignore it.
    pub fn series(&self, measurement: Measurement, wavelength: Option<Wavelength>) -> Option<Series> {
        match measurement {
            Measurement::Weather(field) => {
                let values = self.weather.column(field)?;
                Some(Self::aligned_series(
                    measurement,
                    None,
                    self.weather.index(),
                    values,
                    &self.weather_errors,
                    &field,
                ))
            }
            spectral => {
                let wavelength = wavelength?;
                let (_, accessor) = SPECTRAL_ACCESSORS
                    .iter()
                    .find(|(candidate, _)| *candidate == spectral)?;
                let (table, errors) = accessor(self);
                let values = table.column(&wavelength)?;
                Some(Self::aligned_series(
                    measurement,
                    Some(wavelength),
                    table.index(),
                    values,
                    errors,
                    &wavelength,
                ))
            }
        }
    }

    fn aligned_series<K>(
        measurement: Measurement,
        wavelength: Option<Wavelength>,
        index: &[Timestamp],
        values: &[f64],
        errors: &TimeTable<K, f64>,
        key: &K,
    ) -> Series
    where
        K: Ord + Copy + std::fmt::Display,
    {
        let errors = index
            .iter()
            .map(|ts| errors.get(ts, key).copied().unwrap_or(f64::NAN))
            .collect();

        Series {
            measurement,
            wavelength,
            timestamps: index.to_vec(),
            values: values.to_vec(),
            errors,
        }
    }
}
