use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV writing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Data integrity error: {0}")]
    Integrity(String),

    #[error("Unrecognized site code: {0}")]
    UnknownSite(String),

    #[error("Site {site} not found in data store")]
    SiteNotFound { site: String },

    #[error("{}: {source}", .path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<ProcessingError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ProcessingError {
    /// Attach the path of the file being processed
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            // Keep the innermost path only
            err @ ProcessingError::InFile { .. } => err,
            err => ProcessingError::InFile {
                path: path.into(),
                source: Box::new(err),
            },
        }
    }

    /// The underlying error with any file context removed
    pub fn root(&self) -> &ProcessingError {
        match self {
            ProcessingError::InFile { source, .. } => source.root(),
            err => err,
        }
    }

    pub fn is_format_error(&self) -> bool {
        matches!(self.root(), ProcessingError::InvalidFormat(_))
    }

    pub fn is_integrity_error(&self) -> bool {
        matches!(self.root(), ProcessingError::Integrity(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_file_keeps_innermost_path() {
        let err = ProcessingError::InvalidFormat("bad".to_string())
            .in_file("/data/BTCN/a.input")
            .in_file("/data/BTCN");

        match &err {
            ProcessingError::InFile { path, .. } => {
                assert_eq!(path, &PathBuf::from("/data/BTCN/a.input"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.is_format_error());
        assert!(!err.is_integrity_error());
        assert_eq!(
            err.to_string(),
            "/data/BTCN/a.input: Invalid data format: bad"
        );
    }
}
