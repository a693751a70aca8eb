use crate::error::{ProcessingError, Result};
use crate::models::SiteCode;
use crate::utils::constants::{STAGE_INPUT, STAGE_OUTPUT};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Processing variant of a daily acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Carries surface reflectance
    Input,
    /// Carries top-of-atmosphere reflectance
    Output,
}

impl Stage {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            STAGE_INPUT => Ok(Stage::Input),
            STAGE_OUTPUT => Ok(Stage::Output),
            other => Err(ProcessingError::InvalidFormat(format!(
                "Unknown processing stage: '{}'",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Input => STAGE_INPUT,
            Stage::Output => STAGE_OUTPUT,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything the filename says about a daily file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub instrument: String,
    pub site: SiteCode,
    pub date: NaiveDate,
    pub output_version: String,
    pub input_version: String,
    pub stage: Stage,
}

impl FileMetadata {
    /// Key that pairs an input file with its same-day output counterpart
    pub fn pairing_key(&self) -> (&str, NaiveDate) {
        (&self.instrument, self.date)
    }

    /// Canonical filename for this metadata
    pub fn filename(&self) -> String {
        format!(
            "{}_{}_v{}.{}.{}",
            self.instrument,
            self.date.format("%Y_%j"),
            self.output_version,
            self.input_version,
            self.stage
        )
    }
}

/// A daily file on disk together with its filename metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyFileHandle {
    pub path: PathBuf,
    pub metadata: FileMetadata,
}

impl DailyFileHandle {
    pub fn new(path: PathBuf, metadata: FileMetadata) -> Self {
        Self { path, metadata }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn date(&self) -> NaiveDate {
        self.metadata.date
    }

    pub fn instrument(&self) -> &str {
        &self.metadata.instrument
    }

    pub fn stage(&self) -> Stage {
        self.metadata.stage
    }
}
