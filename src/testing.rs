//! Synthetic daily files for unit tests

use crate::models::{wavelengths, WeatherField};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Builder for the text of a well-formed daily file.
///
/// Defaults to 13 acquisitions on 2018 day 148, 01:00 to 07:00 every 30 minutes,
/// with a water vapour sentinel in the second column.
pub(crate) struct DailyFileText {
    site: String,
    latitude: f64,
    year: i32,
    day_of_year: u32,
    times: Vec<String>,
    reflectance: f64,
}

impl DailyFileText {
    pub fn new(site: &str) -> Self {
        let times = (0..13)
            .map(|i| format!("{:02}:{:02}", 1 + i / 2, (i % 2) * 30))
            .collect();

        Self {
            site: site.to_string(),
            latitude: 40.85486,
            year: 2018,
            day_of_year: 148,
            times,
            reflectance: 0.2,
        }
    }

    pub fn latitude(mut self, latitude: f64) -> Self {
        self.latitude = latitude;
        self
    }

    pub fn day(mut self, year: i32, day_of_year: u32) -> Self {
        self.year = year;
        self.day_of_year = day_of_year;
        self
    }

    pub fn times(mut self, times: &[&str]) -> Self {
        self.times = times.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn reflectance(mut self, reflectance: f64) -> Self {
        self.reflectance = reflectance;
        self
    }

    fn row(out: &mut String, header: &str, values: impl IntoIterator<Item = String>) {
        out.push_str(header);
        for value in values {
            out.push('\t');
            out.push_str(&value);
        }
        out.push('\n');
    }

    pub fn render(&self) -> String {
        let n = self.times.len();
        let mut out = String::new();

        let _ = writeln!(out, "Site:\t{}", self.site);
        let _ = writeln!(out, "Lat:\t{}", self.latitude);
        let _ = writeln!(out, "Lon:\t109.6272");
        let _ = writeln!(out, "Alt:\t1270");
        out.push('\n');

        Self::row(&mut out, "Year:", (0..n).map(|_| self.year.to_string()));
        Self::row(&mut out, "DOY(U):", (0..n).map(|_| format!("{:03}", self.day_of_year)));
        Self::row(&mut out, "UTC:", self.times.iter().cloned());
        Self::row(&mut out, "DOY(L):", (0..n).map(|_| format!("{:03}", self.day_of_year)));
        Self::row(&mut out, "Local:", self.times.iter().cloned());
        for field in WeatherField::ALL {
            let values = (0..n).map(|i| {
                if field == WeatherField::WaterVapor && i == 1 {
                    "9999".to_string()
                } else {
                    "1.5".to_string()
                }
            });
            Self::row(&mut out, &format!("{}:", field.header()), values);
        }
        Self::row(&mut out, "Type:", (0..n).map(|i| if i % 2 == 0 { "D" } else { "C" }.to_string()));
        for wavelength in wavelengths() {
            Self::row(&mut out, &wavelength.to_string(), (0..n).map(|_| self.reflectance.to_string()));
        }
        out.push('\n');

        for field in WeatherField::ALL {
            Self::row(&mut out, &format!("{}:", field.header()), (0..n).map(|_| "0.01".to_string()));
        }
        for wavelength in wavelengths() {
            Self::row(&mut out, &wavelength.to_string(), (0..n).map(|_| "0.01".to_string()));
        }

        out
    }

    pub fn write_to(&self, dir: &Path, filename: &str) -> PathBuf {
        let path = dir.join(filename);
        std::fs::write(&path, self.render()).unwrap();
        path
    }
}
