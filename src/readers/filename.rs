use crate::error::{ProcessingError, Result};
use crate::models::{DailyFileHandle, FileMetadata, SiteCode, Stage};
use crate::utils::time::date_from_ordinal;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

const FILENAME_PATTERN: &str = concat!(
    r"^(?P<instrument>[A-Z]{4}\d{2})",
    r"_(?P<year>\d{4})_(?P<doy>\d{3})",
    r"_(?P<version>v\d{2}\.\d{2})",
    r"\.(?P<stage>input|output)$",
);

fn filename_regex() -> Result<&'static Regex> {
    static FILENAME_RE: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();

    FILENAME_RE
        .get_or_init(|| Regex::new(FILENAME_PATTERN))
        .as_ref()
        .map_err(|e| ProcessingError::Config(format!("Invalid filename pattern: {}", e)))
}

/// Derive metadata from a daily file name such as `BTCN02_2018_148_v02.03.output`
pub fn resolve(filename: &str) -> Result<FileMetadata> {
    let captures = filename_regex()?.captures(filename).ok_or_else(|| {
        ProcessingError::InvalidFormat(format!("Unrecognized daily file name: '{}'", filename))
    })?;
    let group = |name: &str| captures.name(name).map(|m| m.as_str()).unwrap_or_default();

    let instrument = group("instrument");
    let site = SiteCode::from_instrument(instrument)?;
    let date = date_from_ordinal(group("year"), group("doy"))?;

    // vOO.II
    let version = group("version");
    let bytes = version.as_bytes();
    if bytes.len() != 6 || bytes[0] != b'v' || bytes[3] != b'.' {
        return Err(ProcessingError::InvalidFormat(format!(
            "Invalid version in filename: '{}'",
            version
        )));
    }

    Ok(FileMetadata {
        instrument: instrument.to_string(),
        site,
        date,
        output_version: version[1..3].to_string(),
        input_version: version[4..6].to_string(),
        stage: Stage::parse(group("stage"))?,
    })
}

/// Resolve the file name component of a path
pub fn resolve_path(path: &Path) -> Result<DailyFileHandle> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ProcessingError::InvalidFormat("Invalid file path".to_string()))
        .map_err(|e| e.in_file(path))?;

    let metadata = resolve(filename).map_err(|e| e.in_file(path))?;
    Ok(DailyFileHandle::new(path.to_path_buf(), metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_resolve_output_file() {
        let meta = resolve("BTCN02_2018_148_v02.03.output").unwrap();

        assert_eq!(meta.instrument, "BTCN02");
        assert_eq!(meta.site, SiteCode::Btcn);
        assert_eq!(meta.date, NaiveDate::from_ymd_opt(2018, 5, 28).unwrap());
        assert_eq!(meta.output_version, "02");
        assert_eq!(meta.input_version, "03");
        assert_eq!(meta.stage, Stage::Output);
        assert_eq!(meta.filename(), "BTCN02_2018_148_v02.03.output");
    }

    #[test]
    fn test_versions_do_not_depend_on_stage() {
        let meta = resolve("GONA01_2017_001_v00.03.input").unwrap();
        assert_eq!(meta.output_version, "00");
        assert_eq!(meta.input_version, "03");
        assert_eq!(meta.stage, Stage::Input);
        assert_eq!(meta.date, NaiveDate::from_ymd_opt(2017, 1, 1).unwrap());
    }

    #[test]
    fn test_resolve_rejects_malformed_names() {
        for name in [
            "btcn02_2018_148_v02.03.output",
            "BTCN2_2018_148_v02.03.output",
            "BTCN02_18_148_v02.03.output",
            "BTCN02_2018_148_02.03.output",
            "BTCN02_2018_148_v02_03.output",
            "BTCN02_2018_148_v02.03.csv",
            "BTCN02_2018_148_v02.03.output.bak",
            "notes.txt",
        ] {
            let err = resolve(name).unwrap_err();
            assert!(err.is_format_error(), "{} gave {:?}", name, err);
        }

        // day 366 of a non-leap year
        assert!(resolve("BTCN02_2018_366_v02.03.output").unwrap_err().is_format_error());
    }

    #[test]
    fn test_resolve_unknown_site() {
        let err = resolve("ABCD01_2018_148_v02.03.output").unwrap_err();
        assert!(matches!(err, ProcessingError::UnknownSite(ref code) if code == "ABCD01"));
    }

    #[test]
    fn test_resolve_path() {
        let handle = resolve_path(Path::new("/data/BTCN/BTCN02_2018_148_v00.03.input")).unwrap();
        assert_eq!(handle.instrument(), "BTCN02");
        assert_eq!(handle.stage(), Stage::Input);
        assert_eq!(handle.path(), Path::new("/data/BTCN/BTCN02_2018_148_v00.03.input"));

        let err = resolve_path(Path::new("/data/BTCN/README")).unwrap_err();
        assert!(err.is_format_error());
    }
}
