use crate::error::Result;
use crate::models::{SiteMeasurements, TimeTable, WeatherTable};
use crate::utils::constants::{
    HEADER_TYPE, SR_ERRORS_FILE, SR_FILE, TOA_ERRORS_FILE, TOA_FILE, WEATHER_ERRORS_FILE, WEATHER_FILE,
};
use crate::utils::time::format_timestamp;
use csv::WriterBuilder;
use std::fmt::Display;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes measurement tables as CSV, one row per timestamp; NaN becomes an empty cell
pub struct CsvWriter {
    delimiter: u8,
    precision: Option<usize>,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            precision: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Fixed number of decimals instead of the shortest round-trip form
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = Some(precision);
        self
    }

    fn writer(&self, path: &Path) -> Result<csv::Writer<File>> {
        Ok(WriterBuilder::new().delimiter(self.delimiter).from_path(path)?)
    }

    fn format_value(&self, value: f64) -> String {
        if value.is_nan() {
            return String::new();
        }
        match self.precision {
            Some(precision) => format!("{:.*}", precision, value),
            None => value.to_string(),
        }
    }

    /// Write one numeric table
    pub fn write_table<K>(&self, table: &TimeTable<K>, path: &Path) -> Result<()>
    where
        K: Ord + Copy + Display,
    {
        let mut writer = self.writer(path)?;

        let mut header = vec!["timestamp".to_string()];
        header.extend(table.keys().map(|key| key.to_string()));
        writer.write_record(&header)?;

        let columns: Vec<&[f64]> = table.columns().map(|(_, values)| values).collect();
        for (row, timestamp) in table.index().iter().enumerate() {
            let mut record = vec![format_timestamp(timestamp)];
            record.extend(columns.iter().map(|values| self.format_value(values[row])));
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Write the weather readings with the aerosol type as a trailing column
    pub fn write_weather(&self, weather: &WeatherTable, path: &Path) -> Result<()> {
        let mut writer = self.writer(path)?;
        let readings = weather.readings();

        let mut header = vec!["timestamp".to_string()];
        header.extend(readings.keys().map(|field| field.to_string()));
        header.push(HEADER_TYPE.to_string());
        writer.write_record(&header)?;

        let columns: Vec<&[f64]> = readings.columns().map(|(_, values)| values).collect();
        let types = weather.aerosol_type_column().unwrap_or_default();

        for (row, timestamp) in weather.index().iter().enumerate() {
            let mut record = vec![format_timestamp(timestamp)];
            record.extend(columns.iter().map(|values| self.format_value(values[row])));
            record.push(
                types
                    .get(row)
                    .copied()
                    .flatten()
                    .map(|t| t.code().to_string())
                    .unwrap_or_default(),
            );
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Write all six tables into `dir`, returning the created files
    pub fn write_measurements(&self, measurements: &SiteMeasurements, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let weather_path = dir.join(WEATHER_FILE);
        self.write_weather(measurements.weather(), &weather_path)?;

        let weather_errors_path = dir.join(WEATHER_ERRORS_FILE);
        self.write_table(measurements.weather_errors(), &weather_errors_path)?;

        let mut written = vec![weather_path, weather_errors_path];
        let spectral_files = [SR_FILE, SR_ERRORS_FILE, TOA_FILE, TOA_ERRORS_FILE];
        for ((_, table), filename) in measurements.spectral_tables().into_iter().zip(spectral_files) {
            let path = dir.join(filename);
            self.write_table(table, &path)?;
            written.push(path);
        }

        info!(dir = %dir.display(), files = written.len(), "exported measurements");
        Ok(written)
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SiteMetadata, Stage};
    use crate::readers::parse_daily_file;
    use crate::testing::DailyFileText;
    use tempfile::TempDir;

    fn measurements() -> SiteMeasurements {
        let text = DailyFileText::new("BTCN02").times(&["01:00", "01:30"]).render();
        let file = parse_daily_file(text.as_bytes()).unwrap();
        SiteMeasurements::from_daily_file(SiteMetadata::for_instrument("BTCN02"), file, Stage::Input).unwrap()
    }

    #[test]
    fn test_write_weather() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("weather.csv");
        CsvWriter::new().write_weather(measurements().weather(), &path)?;

        let content = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "timestamp,P,T,WV,O3,AOD,Ang,Type");
        assert_eq!(lines[1], "2018-05-28T01:00:00Z,1.5,1.5,1.5,1.5,1.5,1.5,D");
        // sentinel written as an empty cell
        assert_eq!(lines[2], "2018-05-28T01:30:00Z,1.5,1.5,,1.5,1.5,1.5,C");
        Ok(())
    }

    #[test]
    fn test_write_measurements() -> Result<()> {
        let dir = TempDir::new()?;
        let out = dir.path().join("export");
        let written = CsvWriter::new()
            .with_delimiter(b'\t')
            .with_precision(3)
            .write_measurements(&measurements(), &out)?;

        assert_eq!(written.len(), 6);
        assert!(written.iter().all(|p| p.exists()));

        let sr = std::fs::read_to_string(out.join(SR_FILE))?;
        let mut lines = sr.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("timestamp\t400\t410"));
        assert_eq!(header.split('\t').count(), 212);
        assert!(lines.next().unwrap().starts_with("2018-05-28T01:00:00Z\t0.200\t0.200"));

        // no rows, header only
        let toa = std::fs::read_to_string(out.join(TOA_FILE))?;
        assert_eq!(toa.lines().count(), 1);
        Ok(())
    }
}
