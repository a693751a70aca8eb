use crate::error::{ProcessingError, Result};
use crate::models::{SiteCode, SiteMeasurements};
use crate::processors::{DayFileIndex, MeasurementStore, ScanPolicy};
use crate::settings::Settings;
use crate::utils::progress::ProgressReporter;
use crate::utils::time::Timestamp;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Catalog of site directories under one deployment root
pub struct DataStore {
    root: PathBuf,
    indexes: BTreeMap<String, DayFileIndex>,
    store: MeasurementStore,
}

impl DataStore {
    /// Index every site subdirectory of `root`
    pub fn open(root: &Path, settings: &Settings) -> Result<Self> {
        let mut site_dirs = Vec::new();
        for entry in std::fs::read_dir(root).map_err(|e| ProcessingError::from(e).in_file(root))? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            match path.file_name().and_then(|name| name.to_str()) {
                Some(name) => {
                    if SiteCode::from_code(name).is_none() {
                        warn!(site = name, "site directory is not in the site registry");
                    }
                    site_dirs.push((name.to_string(), path.clone()));
                }
                None => warn!(path = %path.display(), "skipping non UTF-8 directory name"),
            }
        }

        let indexes = Self::build_indexes(&site_dirs, settings.scan_policy, settings.workers())?;
        info!(root = %root.display(), sites = indexes.len(), "opened data store");

        Ok(Self {
            root: root.to_path_buf(),
            indexes,
            store: MeasurementStore::from_settings(settings),
        })
    }

    fn build_indexes(
        site_dirs: &[(String, PathBuf)],
        policy: ScanPolicy,
        workers: usize,
    ) -> Result<BTreeMap<String, DayFileIndex>> {
        let build = |(site, dir): &(String, PathBuf)| -> Result<(String, DayFileIndex)> {
            Ok((site.clone(), DayFileIndex::build(dir, policy)?))
        };

        if workers <= 1 || site_dirs.len() <= 1 {
            return site_dirs.iter().map(build).collect();
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;
        pool.install(|| site_dirs.par_iter().map(build).collect())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Site names in sorted order
    pub fn sites(&self) -> impl Iterator<Item = &str> {
        self.indexes.keys().map(String::as_str)
    }

    pub fn index(&self, site: &str) -> Result<&DayFileIndex> {
        self.indexes.get(site).ok_or_else(|| ProcessingError::SiteNotFound {
            site: site.to_string(),
        })
    }

    /// Measurements of a site within `[from, to]`.
    ///
    /// Files are selected by calendar day, then the merged tables are cut to the exact
    /// bounds. One instrument is used: the one of the earliest matching file.
    pub fn get_measurements(
        &self,
        site: &str,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<SiteMeasurements> {
        self.get_instrument_measurements(site, None, from, to, None)
    }

    pub fn get_instrument_measurements(
        &self,
        site: &str,
        instrument: Option<&str>,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
        progress: Option<&ProgressReporter>,
    ) -> Result<SiteMeasurements> {
        let paths = self.index(site)?.query(from, to);
        let measurements = self.store.build_with_progress(&paths, instrument, progress)?;
        Ok(measurements.slice(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::DailyFileText;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn store_root() -> TempDir {
        let root = TempDir::new().unwrap();
        let btcn = root.path().join("BTCN");
        let gona = root.path().join("GONA");
        std::fs::create_dir_all(&btcn).unwrap();
        std::fs::create_dir_all(&gona).unwrap();

        DailyFileText::new("BTCN02").write_to(&btcn, "BTCN02_2018_148_v00.03.input");
        DailyFileText::new("BTCN02").write_to(&btcn, "BTCN02_2018_148_v02.03.output");
        DailyFileText::new("BTCN02")
            .day(2018, 150)
            .write_to(&btcn, "BTCN02_2018_150_v02.03.output");
        std::fs::write(root.path().join("README"), "").unwrap();
        root
    }

    #[test]
    fn test_open_lists_sites() -> Result<()> {
        let root = store_root();
        let store = DataStore::open(root.path(), &Settings::default())?;

        assert_eq!(store.sites().collect::<Vec<_>>(), vec!["BTCN", "GONA"]);
        assert_eq!(store.index("BTCN")?.len(), 3);
        assert!(store.index("GONA")?.is_empty());
        assert!(matches!(
            store.index("LCFR"),
            Err(ProcessingError::SiteNotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_get_measurements_slices_to_bounds() -> Result<()> {
        let root = store_root();
        let settings = Settings {
            max_workers: 2,
            ..Settings::default()
        };
        let store = DataStore::open(root.path(), &settings)?;

        let all = store.get_measurements("BTCN", None, None)?;
        assert_eq!(all.weather().len(), 26);

        let from = Utc.with_ymd_and_hms(2018, 5, 28, 1, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2018, 5, 28, 2, 0, 0).unwrap();
        let hour = store.get_measurements("BTCN", Some(from), Some(to))?;
        assert_eq!(hour.weather().len(), 3);
        assert_eq!(hour.sr().len(), 3);

        let before = Utc.with_ymd_and_hms(2017, 5, 1, 4, 0, 0).unwrap();
        let none = store.get_measurements("BTCN", None, Some(before))?;
        assert!(none.is_empty());

        let empty_site = store.get_measurements("GONA", None, None)?;
        assert!(empty_site.is_empty());
        Ok(())
    }

    #[test]
    fn test_unknown_site_query() {
        let root = store_root();
        let store = DataStore::open(root.path(), &Settings::default()).unwrap();
        let err = store.get_measurements("RVUS", None, None).unwrap_err();
        assert!(matches!(err, ProcessingError::SiteNotFound { site } if site == "RVUS"));
    }
}
