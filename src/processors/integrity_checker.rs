use crate::error::{ProcessingError, Result};
use crate::models::{FileHeader, SiteMeasurements, SiteMetadata, TimeTable};
use crate::utils::constants::{SENTINEL_THRESHOLD, SITE_CODE_LEN};
use crate::utils::time::{format_timestamp, Timestamp};
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;
use validator::Validate;

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub instrument: Option<String>,
    pub total_rows: usize,
    pub tables: Vec<TableStatistics>,
    pub violations: Vec<Violation>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableStatistics {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    pub missing_cells: usize,
    pub first: Option<Timestamp>,
    pub last: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub table: String,
    pub violation_type: ViolationType,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViolationType {
    /// A value at or above the sentinel threshold survived sanitation
    SentinelSurvived,
    /// An uncertainty below zero
    NegativeError,
    /// Values and their errors are on different timestamp axes
    MisalignedErrors,
}

/// Cross-file consistency checks and post-build quality reports
pub struct IntegrityChecker {
    strict_mode: bool,
    max_listed_violations: usize,
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self {
            strict_mode: false,
            max_listed_violations: 10,
        }
    }

    /// In strict mode `check_integrity` fails when any violation is found
    pub fn with_strict_mode(strict_mode: bool) -> Self {
        Self {
            strict_mode,
            ..Self::new()
        }
    }

    /// Validate a file's metadata block against what earlier files established.
    ///
    /// Returns the metadata to carry forward: unset instrument and coordinates are
    /// seeded from the file, set ones must match it exactly.
    pub fn admit(&self, metadata: &SiteMetadata, header: &FileHeader, path: &Path) -> Result<SiteMetadata> {
        let mut admitted = metadata.clone();

        match metadata.instrument.as_deref() {
            None => {
                admitted.instrument = Some(header.site.clone());
                admitted.site = Some(header.site.chars().take(SITE_CODE_LEN).collect());
            }
            Some(instrument) if instrument != header.site => {
                return Err(ProcessingError::Integrity(format!(
                    "File declares site {} but instrument {} was expected",
                    header.site, instrument
                ))
                .in_file(path));
            }
            Some(_) => {}
        }

        let coordinates = header.coordinates();
        match metadata.coordinates {
            None => {
                coordinates
                    .validate()
                    .map_err(|e| ProcessingError::from(e).in_file(path))?;
                admitted.coordinates = Some(coordinates);
            }
            Some(expected) if expected != coordinates => {
                return Err(ProcessingError::Integrity(format!(
                    "Site coordinates {:?} do not match other files {:?}",
                    coordinates, expected
                ))
                .in_file(path));
            }
            Some(_) => {}
        }

        Ok(admitted)
    }

    /// Statistics and quality violations for built measurements
    pub fn check_integrity(&self, measurements: &SiteMeasurements) -> Result<IntegrityReport> {
        let weather = measurements.weather();
        let mut report = IntegrityReport {
            instrument: measurements.metadata().instrument.clone(),
            total_rows: weather.len(),
            tables: Vec::new(),
            violations: Vec::new(),
        };

        report.tables.push(Self::table_statistics("weather", weather.readings()));
        report
            .tables
            .push(Self::table_statistics("weather_errs", measurements.weather_errors()));
        for (name, table) in measurements.spectral_tables() {
            report.tables.push(Self::table_statistics(name, table));
        }

        self.check_sentinels("weather", weather.readings(), &mut report);
        self.check_errors("weather_errs", weather.readings(), measurements.weather_errors(), &mut report);

        let [sr, sr_errs, toa, toa_errs] = measurements.spectral_tables();
        for ((name, values), (error_name, errors)) in [(sr, sr_errs), (toa, toa_errs)] {
            self.check_sentinels(name, values, &mut report);
            self.check_errors(error_name, values, errors, &mut report);
        }

        if self.strict_mode && !report.is_clean() {
            return Err(ProcessingError::Integrity(format!(
                "{} integrity violations found",
                report.violations.len()
            )));
        }

        Ok(report)
    }

    fn table_statistics<K>(name: &str, table: &TimeTable<K>) -> TableStatistics
    where
        K: Ord + Copy + Display,
    {
        TableStatistics {
            name: name.to_string(),
            rows: table.len(),
            columns: table.column_count(),
            missing_cells: table.missing_cells(),
            first: table.first_timestamp(),
            last: table.last_timestamp(),
        }
    }

    fn check_sentinels<K>(&self, name: &str, table: &TimeTable<K>, report: &mut IntegrityReport)
    where
        K: Ord + Copy + Display,
    {
        let count = table.count_where(|value| value >= SENTINEL_THRESHOLD);
        if count > 0 {
            report.violations.push(Violation {
                table: name.to_string(),
                violation_type: ViolationType::SentinelSurvived,
                details: format!("{} cells at or above {}", count, SENTINEL_THRESHOLD),
            });
        }
    }

    fn check_errors<K>(
        &self,
        name: &str,
        values: &TimeTable<K>,
        errors: &TimeTable<K>,
        report: &mut IntegrityReport,
    ) where
        K: Ord + Copy + Display,
    {
        self.check_sentinels(name, errors, report);

        for (key, column) in errors.columns() {
            let negative: Vec<usize> = column
                .iter()
                .enumerate()
                .filter(|(_, value)| **value < 0.0)
                .map(|(row, _)| row)
                .collect();
            if let Some(&row) = negative.first() {
                report.violations.push(Violation {
                    table: name.to_string(),
                    violation_type: ViolationType::NegativeError,
                    details: format!(
                        "column {}: {} negative values, first at {}",
                        key,
                        negative.len(),
                        format_timestamp(&errors.index()[row])
                    ),
                });
            }
        }

        if !values.is_empty() && !errors.is_empty() && values.index() != errors.index() {
            report.violations.push(Violation {
                table: name.to_string(),
                violation_type: ViolationType::MisalignedErrors,
                details: format!(
                    "{} value rows vs {} error rows on different timestamps",
                    values.len(),
                    errors.len()
                ),
            });
        }
    }

    /// Generate a summary report
    pub fn generate_summary(&self, report: &IntegrityReport) -> String {
        let mut summary = String::new();

        summary.push_str("=== Integrity Check Report ===\n");
        summary.push_str(&format!(
            "Instrument: {}\n",
            report.instrument.as_deref().unwrap_or("-")
        ));
        summary.push_str(&format!("Total Rows: {}\n\n", report.total_rows));

        summary.push_str(&format!(
            "{:<14}{:>8}{:>9}{:>10}  {}\n",
            "Table", "Rows", "Columns", "Missing", "Range"
        ));
        for table in &report.tables {
            let range = match (table.first, table.last) {
                (Some(first), Some(last)) => {
                    format!("{} .. {}", format_timestamp(&first), format_timestamp(&last))
                }
                _ => "-".to_string(),
            };
            let cells = table.rows * table.columns;
            let missing_pct = if cells > 0 {
                100.0 * table.missing_cells as f64 / cells as f64
            } else {
                0.0
            };
            summary.push_str(&format!(
                "{:<14}{:>8}{:>9}{:>9.1}%  {}\n",
                table.name, table.rows, table.columns, missing_pct, range
            ));
        }

        summary.push_str(&format!("\nViolations: {}\n", report.violations.len()));
        if !report.violations.is_empty() {
            summary.push_str(&format!("\nTop {} Violations:\n", self.max_listed_violations));
            for (i, violation) in report
                .violations
                .iter()
                .take(self.max_listed_violations)
                .enumerate()
            {
                summary.push_str(&format!(
                    "  {}. [{}] {:?}: {}\n",
                    i + 1,
                    violation.table,
                    violation.violation_type,
                    violation.details
                ));
            }
        }

        summary
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}
