use crate::error::{ProcessingError, Result};
use crate::models::{ConflictPolicy, DailyFile, DailyFileHandle, SiteMeasurements, SiteMetadata};
use crate::processors::IntegrityChecker;
use crate::readers::{resolve_path, DailyFileReader};
use crate::settings::Settings;
use crate::utils::progress::ProgressReporter;
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// Builds merged measurements from daily files
pub struct MeasurementStore {
    conflict_policy: ConflictPolicy,
    max_workers: usize,
    reader: DailyFileReader,
}

impl MeasurementStore {
    pub fn new() -> Self {
        Self {
            conflict_policy: ConflictPolicy::default(),
            max_workers: 1,
            reader: DailyFileReader::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new()
            .with_conflict_policy(settings.conflict_policy)
            .with_max_workers(settings.workers())
            .with_mmap(settings.use_mmap)
    }

    pub fn with_conflict_policy(mut self, conflict_policy: ConflictPolicy) -> Self {
        self.conflict_policy = conflict_policy;
        self
    }

    /// Files are parsed on a thread pool when more than one worker is allowed
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.reader = DailyFileReader::with_mmap(use_mmap);
        self
    }

    pub fn build_from_paths<P: AsRef<Path>>(&self, paths: &[P], instrument: Option<&str>) -> Result<SiteMeasurements> {
        self.build_with_progress(paths, instrument, None)
    }

    /// Merge the daily files at `paths` into one set of measurements.
    ///
    /// Only files of one instrument are used: `instrument` if given, otherwise the
    /// instrument of the first path. Same-day input and output files are paired; more
    /// than two files for one day is an integrity error.
    pub fn build_with_progress<P: AsRef<Path>>(
        &self,
        paths: &[P],
        instrument: Option<&str>,
        progress: Option<&ProgressReporter>,
    ) -> Result<SiteMeasurements> {
        let mut handles = paths
            .iter()
            .map(|path| resolve_path(path.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let instrument = instrument
            .map(str::to_string)
            .or_else(|| handles.first().map(|h| h.instrument().to_string()));

        let Some(instrument) = instrument else {
            return Ok(SiteMeasurements::empty(SiteMetadata::default()));
        };

        let total = handles.len();
        handles.retain(|h| h.instrument() == instrument);
        if handles.len() < total {
            debug!(
                instrument = %instrument,
                skipped = total - handles.len(),
                "ignoring files of other instruments"
            );
        }

        handles.sort_by(|a, b| {
            a.metadata
                .pairing_key()
                .cmp(&b.metadata.pairing_key())
                .then_with(|| a.stage().cmp(&b.stage()))
                .then_with(|| a.path.cmp(&b.path))
        });
        let groups = Self::pair_by_day(&handles)?;

        info!(
            instrument = %instrument,
            files = handles.len(),
            days = groups,
            "building measurements"
        );

        if let Some(p) = progress {
            p.set_length(handles.len() as u64);
            p.set_message(&format!("Reading {} daily files...", handles.len()));
        }

        let parsed = self.parse_all(&handles)?;

        let checker = IntegrityChecker::new();
        let mut metadata = SiteMetadata::for_instrument(&instrument);
        let mut parts = Vec::with_capacity(handles.len());

        for (handle, file) in handles.iter().zip(parsed) {
            let file = file?;
            metadata = checker.admit(&metadata, &file.header, &handle.path)?;
            let part = SiteMeasurements::from_daily_file(metadata.clone(), file, handle.stage())
                .map_err(|e| e.in_file(&handle.path))?;
            parts.push(part);

            if let Some(p) = progress {
                p.increment(1);
            }
        }

        let measurements = SiteMeasurements::combine(metadata, &parts, self.conflict_policy)?;

        if let Some(p) = progress {
            p.finish_with_message(&format!(
                "Merged {} files into {} rows",
                handles.len(),
                measurements.weather().len()
            ));
        }

        Ok(measurements)
    }

    /// Check the per-day grouping of sorted handles; returns the number of days
    fn pair_by_day(handles: &[DailyFileHandle]) -> Result<usize> {
        let mut days = 0;
        let mut start = 0;

        for end in 1..=handles.len() {
            if end < handles.len() && handles[end].metadata.pairing_key() == handles[start].metadata.pairing_key() {
                continue;
            }

            let group = &handles[start..end];
            if group.len() > 2 {
                return Err(ProcessingError::Integrity(format!(
                    "Duplicate input files for {} on {}: {}",
                    group[0].instrument(),
                    group[0].date(),
                    group
                        .iter()
                        .map(|h| h.path.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
            if group.len() == 2 && group[0].stage() == group[1].stage() {
                warn!(
                    instrument = group[0].instrument(),
                    date = %group[0].date(),
                    stage = %group[0].stage(),
                    "two files of the same stage for one day"
                );
            }

            days += 1;
            start = end;
        }

        Ok(days)
    }

    fn parse_all(&self, handles: &[DailyFileHandle]) -> Result<Vec<Result<DailyFile>>> {
        if self.max_workers <= 1 || handles.len() <= 1 {
            return Ok(handles.iter().map(|h| self.reader.read(&h.path)).collect());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        Ok(pool.install(|| handles.par_iter().map(|h| self.reader.read(&h.path)).collect()))
    }
}

impl Default for MeasurementStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Measurement, WeatherField};
    use crate::testing::DailyFileText;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const INPUT: &str = "BTCN02_2018_148_v00.03.input";
    const OUTPUT: &str = "BTCN02_2018_148_v02.03.output";

    fn pair(dir: &Path) -> (PathBuf, PathBuf) {
        (
            DailyFileText::new("BTCN02").reflectance(0.25).write_to(dir, INPUT),
            DailyFileText::new("BTCN02").reflectance(0.2).write_to(dir, OUTPUT),
        )
    }

    #[test]
    fn test_build_pairs_input_and_output() -> Result<()> {
        let dir = TempDir::new()?;
        let (input, output) = pair(dir.path());

        let m = MeasurementStore::new().build_from_paths(&[&input, &output], Some("BTCN02"))?;
        assert_eq!(m.weather().len(), 13);
        assert_eq!(m.weather_errors().len(), 13);
        assert_eq!(m.sr().len(), 13);
        assert_eq!(m.sr_errors().len(), 13);
        assert_eq!(m.toa().len(), 13);
        assert_eq!(m.toa_errors().len(), 13);
        assert_eq!(m.metadata().instrument.as_deref(), Some("BTCN02"));
        assert_eq!(m.metadata().site.as_deref(), Some("BTCN"));
        assert!(m.metadata().coordinates.is_some());

        // weather is carried by both stages and must agree
        let output_only = MeasurementStore::new().build_from_paths(&[&output], None)?;
        assert_eq!(m.weather(), output_only.weather());
        assert!(output_only.sr().is_empty());

        // sentinels are gone
        assert!(m.weather().column(WeatherField::WaterVapor).unwrap()[1].is_nan());
        Ok(())
    }

    #[test]
    fn test_build_is_order_independent() -> Result<()> {
        let dir = TempDir::new()?;
        let (input, output) = pair(dir.path());
        let store = MeasurementStore::new();

        let a = store.build_from_paths(&[&input, &output], None)?;
        let b = store.build_from_paths(&[&output, &input], None)?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_parallel_build_matches_sequential() -> Result<()> {
        let dir = TempDir::new()?;
        let (input, output) = pair(dir.path());
        let next_day = DailyFileText::new("BTCN02")
            .day(2018, 149)
            .write_to(dir.path(), "BTCN02_2018_149_v00.03.input");
        let paths = [&input, &output, &next_day];

        let sequential = MeasurementStore::new().build_from_paths(&paths, None)?;
        let parallel = MeasurementStore::new().with_max_workers(4).build_from_paths(&paths, None)?;
        assert_eq!(sequential, parallel);
        assert_eq!(parallel.weather().len(), 26);
        assert_eq!(parallel.toa().len(), 13);
        Ok(())
    }

    #[test]
    fn test_empty_paths() -> Result<()> {
        let paths: [PathBuf; 0] = [];
        let m = MeasurementStore::new().build_from_paths(&paths, None)?;
        assert!(m.is_empty());
        assert_eq!(m.metadata(), &SiteMetadata::default());
        assert_eq!(m.sr().column_count(), 211);

        let seeded = MeasurementStore::new().build_from_paths(&paths, Some("GONA01"))?;
        assert_eq!(seeded.metadata(), &SiteMetadata::for_instrument("GONA01"));
        Ok(())
    }

    #[test]
    fn test_instrument_filter() -> Result<()> {
        let dir = TempDir::new()?;
        let (input, output) = pair(dir.path());
        let other = DailyFileText::new("BTCN01").write_to(dir.path(), "BTCN01_2018_148_v00.03.input");

        // implicit filter from the first path
        let m = MeasurementStore::new().build_from_paths(&[&other, &input, &output], None)?;
        assert_eq!(m.metadata().instrument.as_deref(), Some("BTCN01"));
        assert_eq!(m.sr().len(), 13);
        assert!(m.toa().is_empty());

        let none = MeasurementStore::new().build_from_paths(&[&input, &output], Some("BTCN09"))?;
        assert!(none.is_empty());
        assert_eq!(none.metadata().instrument.as_deref(), Some("BTCN09"));
        Ok(())
    }

    #[test]
    fn test_duplicate_files_for_one_day() -> Result<()> {
        let dir = TempDir::new()?;
        let (input, output) = pair(dir.path());
        let extra = DailyFileText::new("BTCN02").write_to(dir.path(), "BTCN02_2018_148_v01.03.input");

        let err = MeasurementStore::new()
            .build_from_paths(&[&input, &output, &extra], None)
            .unwrap_err();
        assert!(err.is_integrity_error());
        assert!(err.to_string().contains("Duplicate input files"));
        Ok(())
    }

    #[test]
    fn test_coordinate_mismatch_aborts_build() -> Result<()> {
        let dir = TempDir::new()?;
        let (input, _) = pair(dir.path());
        let moved = DailyFileText::new("BTCN02")
            .latitude(41.0)
            .day(2018, 149)
            .write_to(dir.path(), "BTCN02_2018_149_v02.03.output");

        let err = MeasurementStore::new().build_from_paths(&[&input, &moved], None).unwrap_err();
        assert!(err.is_integrity_error());
        match err {
            ProcessingError::InFile { path, .. } => assert_eq!(path, moved),
            other => panic!("unexpected error: {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_declared_site_must_match_filename() -> Result<()> {
        let dir = TempDir::new()?;
        let renamed = DailyFileText::new("BTCN03").write_to(dir.path(), INPUT);

        let err = MeasurementStore::new().build_from_paths(&[&renamed], None).unwrap_err();
        assert!(err.is_integrity_error());
        Ok(())
    }

    #[test]
    fn test_unresolvable_path_is_an_error() {
        let err = MeasurementStore::new()
            .build_from_paths(&[Path::new("/tmp/notes.txt")], None)
            .unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_conflicting_days_follow_policy() -> Result<()> {
        let dir = TempDir::new()?;
        let first = DailyFileText::new("BTCN02").reflectance(0.2).write_to(dir.path(), INPUT);
        let second = DailyFileText::new("BTCN02")
            .reflectance(0.3)
            .write_to(dir.path(), "BTCN02_2018_148_v01.03.input");

        let err = MeasurementStore::new().build_from_paths(&[&first, &second], None).unwrap_err();
        assert!(err.is_integrity_error());

        let m = MeasurementStore::new()
            .with_conflict_policy(ConflictPolicy::PreferLast)
            .build_from_paths(&[&first, &second], None)?;
        assert_eq!(m.sr().len(), 13);
        assert_eq!(m.sr().column(&550).unwrap()[0], 0.3);
        assert_eq!(
            m.series(Measurement::SurfaceReflectance, Some(550)).map(|s| s.values.len()),
            Some(13)
        );
        Ok(())
    }
}
