use crate::error::{ProcessingError, Result};
use crate::models::ConflictPolicy;
use crate::processors::ScanPolicy;
use crate::utils::constants::{DEFAULT_MAX_WORKERS, SETTINGS_ENV_PREFIX};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime settings: defaults, then an optional settings file, then `RADCALNET_*`
/// environment variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Deployment directory with one subdirectory per site
    pub store_root: Option<PathBuf>,
    pub scan_policy: ScanPolicy,
    pub conflict_policy: ConflictPolicy,
    /// 0 means one worker per CPU
    pub max_workers: usize,
    pub use_mmap: bool,
    pub timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_root: None,
            scan_policy: ScanPolicy::default(),
            conflict_policy: ConflictPolicy::default(),
            max_workers: DEFAULT_MAX_WORKERS,
            use_mmap: false,
            timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ProcessingError::Config(format!(
                    "Settings file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path));
        }

        let settings: Settings = builder
            .add_source(Environment::with_prefix(SETTINGS_ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == Some(0) {
            return Err(ProcessingError::Config(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective worker count
    pub fn workers(&self) -> usize {
        match self.max_workers {
            0 => num_cpus::get(),
            n => n,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.scan_policy, ScanPolicy::Skip);
        assert_eq!(settings.conflict_policy, ConflictPolicy::Reject);
        assert_eq!(settings.workers(), 1);
        assert_eq!(settings.timeout(), None);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "store_root = \"/data/radcalnet\"")?;
        writeln!(file, "scan_policy = \"abort\"")?;
        writeln!(file, "conflict_policy = \"prefer-last\"")?;
        writeln!(file, "max_workers = 0")?;
        writeln!(file, "timeout_secs = 30")?;

        let settings = Settings::load(Some(file.path()))?;
        assert_eq!(settings.store_root, Some(PathBuf::from("/data/radcalnet")));
        assert_eq!(settings.scan_policy, ScanPolicy::Abort);
        assert_eq!(settings.conflict_policy, ConflictPolicy::PreferLast);
        assert_eq!(settings.workers(), num_cpus::get());
        assert_eq!(settings.timeout(), Some(Duration::from_secs(30)));
        assert!(!settings.use_mmap);
        Ok(())
    }

    #[test]
    fn test_load_rejects_bad_values() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "scan_policy = \"sometimes\"")?;
        assert!(matches!(
            Settings::load(Some(file.path())),
            Err(ProcessingError::Settings(_))
        ));

        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "timeout_secs = 0")?;
        assert!(matches!(
            Settings::load(Some(file.path())),
            Err(ProcessingError::Config(_))
        ));

        assert!(Settings::load(Some(Path::new("/nonexistent/settings.toml"))).is_err());
        Ok(())
    }
}
