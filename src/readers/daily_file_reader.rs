use crate::error::{ProcessingError, Result};
use crate::models::DailyFile;
use crate::readers::block_parser::parse_daily_file;
use crate::utils::constants::DEFAULT_BUFFER_SIZE;
use memmap2::Mmap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Reads and decodes daily files from disk
#[derive(Debug, Clone, Copy)]
pub struct DailyFileReader {
    use_mmap: bool,
}

impl DailyFileReader {
    pub fn new() -> Self {
        Self { use_mmap: false }
    }

    pub fn with_mmap(use_mmap: bool) -> Self {
        Self { use_mmap }
    }

    /// Parse one daily file; any error carries the file path
    pub fn read(&self, path: &Path) -> Result<DailyFile> {
        let result = if self.use_mmap {
            self.read_mmap(path)
        } else {
            self.read_buffered(path)
        };

        match &result {
            Ok(file) => debug!(path = %path.display(), rows = file.len(), "parsed daily file"),
            Err(e) => debug!(path = %path.display(), error = %e, "failed to parse daily file"),
        }

        result.map_err(|e| e.in_file(path))
    }

    fn read_buffered(&self, path: &Path) -> Result<DailyFile> {
        let file = File::open(path)?;
        parse_daily_file(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file))
    }

    fn read_mmap(&self, path: &Path) -> Result<DailyFile> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        std::str::from_utf8(&mmap)
            .map_err(|e| ProcessingError::InvalidFormat(format!("Invalid UTF-8: {}", e)))?;

        parse_daily_file(&mmap[..])
    }
}

impl Default for DailyFileReader {
    fn default() -> Self {
        Self::new()
    }
}
