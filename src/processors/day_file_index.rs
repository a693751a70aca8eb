use crate::error::{ProcessingError, Result};
use crate::models::DailyFileHandle;
use crate::readers::resolve_path;
use crate::utils::time::Timestamp;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What to do with directory entries whose names are not daily file names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPolicy {
    /// Leave them out of the index and record them in `skipped()`
    #[default]
    Skip,
    /// Fail the whole index build
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: String,
}

/// Date-ordered index over the daily files of one site directory
#[derive(Debug, Clone)]
pub struct DayFileIndex {
    dir: PathBuf,
    handles: Vec<DailyFileHandle>,
    dates: Vec<NaiveDate>,
    skipped: Vec<SkippedEntry>,
}

impl DayFileIndex {
    /// Scan `dir` (non-recursively) and index every daily file in it
    pub fn build(dir: &Path, policy: ScanPolicy) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| ProcessingError::from(e).in_file(dir))?;

        let mut handles = Vec::new();
        let mut skipped = Vec::new();

        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                debug!(path = %path.display(), "ignoring non-file entry");
                continue;
            }

            match resolve_path(&path) {
                Ok(handle) => handles.push(handle),
                Err(e) if policy == ScanPolicy::Abort => return Err(e),
                Err(e) => {
                    warn!(path = %path.display(), error = %e.root(), "skipping unrecognized file");
                    skipped.push(SkippedEntry {
                        path,
                        reason: e.root().to_string(),
                    });
                }
            }
        }

        let mut index = Self::from_handles(dir, handles);
        skipped.sort_by(|a, b| a.path.cmp(&b.path));
        index.skipped = skipped;

        info!(
            dir = %dir.display(),
            files = index.len(),
            skipped = index.skipped.len(),
            "indexed site directory"
        );

        Ok(index)
    }

    /// Index already resolved handles
    pub fn from_handles(dir: &Path, mut handles: Vec<DailyFileHandle>) -> Self {
        handles.sort_by(|a, b| {
            a.date()
                .cmp(&b.date())
                .then_with(|| a.instrument().cmp(b.instrument()))
                .then_with(|| a.stage().cmp(&b.stage()))
                .then_with(|| a.path.cmp(&b.path))
        });
        let dates = handles.iter().map(DailyFileHandle::date).collect();

        Self {
            dir: dir.to_path_buf(),
            handles,
            dates,
            skipped: Vec::new(),
        }
    }

    /// Paths of the files dated within `[from, to]`, compared by calendar day.
    ///
    /// A missing bound extends one day past the indexed range on that side.
    pub fn query(&self, from: Option<Timestamp>, to: Option<Timestamp>) -> Vec<PathBuf> {
        self.query_dates(from.map(|t| t.date_naive()), to.map(|t| t.date_naive()))
    }

    pub fn query_dates(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Vec<PathBuf> {
        let (Some(first), Some(last)) = (self.first_date(), self.last_date()) else {
            return Vec::new();
        };

        let start = from.unwrap_or_else(|| first.pred_opt().unwrap_or(first));
        let stop = to.unwrap_or_else(|| last.succ_opt().unwrap_or(last));

        let lower = self.dates.partition_point(|date| *date < start);
        let upper = self.dates.partition_point(|date| *date <= stop);
        if upper <= lower {
            return Vec::new();
        }

        self.handles[lower..upper]
            .iter()
            .map(|handle| handle.path.clone())
            .collect()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn handles(&self) -> &[DailyFileHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn instruments(&self) -> BTreeSet<&str> {
        self.handles.iter().map(DailyFileHandle::instrument).collect()
    }

    pub fn skipped(&self) -> &[SkippedEntry] {
        &self.skipped
    }
}
