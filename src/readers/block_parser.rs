//! Decoder for the tab-separated, blank-line-delimited daily file format.
//!
//! A daily file holds three blocks: metadata (`Key:\tvalue` lines), main data
//! (times, weather, aerosol type and spectral rows) and error data (weather and
//! spectral uncertainties). Data rows are `Header:\tv1\tv2...`, one value per timestamp.

use crate::error::{ProcessingError, Result};
use crate::models::{AerosolType, DailyFile, FileHeader, Wavelength, WeatherField};
use crate::utils::constants::{
    DAILY_FILE_BLOCKS, HEADER_ANGSTROM, HEADER_DOY_UTC, HEADER_LOCAL, HEADER_TYPE, HEADER_UTC,
    HEADER_YEAR, INSTRUMENT_CODE_LEN, META_ALTITUDE, META_LATITUDE, META_LONGITUDE, META_SITE,
};
use crate::utils::time::{timestamp_from_ordinal, Timestamp};
use std::collections::BTreeMap;
use std::io::BufRead;

/// One line, split on tabs
pub type Line = Vec<String>;

/// Consecutive non-blank lines
pub type Block = Vec<Line>;

/// Header → values of a data sub-block, header colons stripped
pub type Subblock<'a> = BTreeMap<String, &'a [String]>;

/// Lazy iterator over the blocks of a text stream
pub struct Blocks<R> {
    reader: R,
    finished: bool,
}

/// Split a text stream into blocks.
///
/// A line that is blank after trimming ends the current block; a trailing block
/// without a terminating blank line is still yielded.
pub fn split_blocks<R: BufRead>(reader: R) -> Blocks<R> {
    Blocks {
        reader,
        finished: false,
    }
}

impl<R: BufRead> Iterator for Blocks<R> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut block = Block::new();
        let mut line = String::new();

        loop {
            line.clear();

            match self.reader.read_line(&mut line) {
                Ok(0) => {
                    self.finished = true;
                    return if block.is_empty() { None } else { Some(Ok(block)) };
                }
                Ok(_) => {
                    if line.trim().is_empty() {
                        if block.is_empty() {
                            continue;
                        }
                        return Some(Ok(block));
                    }
                    block.push(line.trim_end().split('\t').map(str::to_string).collect());
                }
                Err(e) => {
                    self.finished = true;
                    // read_line reports undecodable bytes as InvalidData
                    let err = match e.kind() {
                        std::io::ErrorKind::InvalidData => {
                            ProcessingError::InvalidFormat(format!("Invalid UTF-8: {}", e))
                        }
                        _ => e.into(),
                    };
                    return Some(Err(err));
                }
            }
        }
    }
}

fn header_key(header: &str) -> &str {
    header.trim_end_matches(':')
}

fn parse_float(header: &str, value: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| {
        ProcessingError::InvalidFormat(format!("Invalid number in row {}: '{}'", header, value))
    })
}

fn parse_floats(header: &str, values: &[String]) -> Result<Vec<f64>> {
    values.iter().map(|value| parse_float(header, value)).collect()
}

/// Decode the metadata block.
///
/// Requires `Site` (a 6 character instrument code) and numeric `Lat`, `Lon`, `Alt`;
/// other keys are kept as text.
pub fn parse_metadata_block(block: &[Line]) -> Result<FileHeader> {
    let mut entries = BTreeMap::new();

    for line in block {
        match line.as_slice() {
            [key, value] => {
                entries.insert(header_key(key).to_string(), value.clone());
            }
            other => {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Metadata line must have a key and a value, found {} fields",
                    other.len()
                )))
            }
        }
    }

    let mut take = |key: &str| {
        entries
            .remove(key)
            .ok_or_else(|| ProcessingError::InvalidFormat(format!("Missing metadata key {}", key)))
    };

    let site = take(META_SITE)?.trim().to_string();
    if site.chars().count() != INSTRUMENT_CODE_LEN {
        return Err(ProcessingError::InvalidFormat(format!(
            "Invalid site name: '{}'",
            site
        )));
    }

    let latitude = parse_float(META_LATITUDE, &take(META_LATITUDE)?)?;
    let longitude = parse_float(META_LONGITUDE, &take(META_LONGITUDE)?)?;
    let altitude = parse_float(META_ALTITUDE, &take(META_ALTITUDE)?)?;

    Ok(FileHeader {
        site,
        latitude,
        longitude,
        altitude,
        extra: entries,
    })
}

/// Consume rows up to and including the row headed `until`.
///
/// Stops early, without error, when the lines run out.
pub fn read_data_subblock<'a, I>(lines: &mut I, until: &str) -> Subblock<'a>
where
    I: Iterator<Item = &'a Line>,
{
    let mut rows = Subblock::new();

    for line in lines.by_ref() {
        let Some((head, values)) = line.split_first() else {
            continue;
        };
        let head = header_key(head);
        rows.insert(head.to_string(), values);
        if head == until {
            break;
        }
    }

    rows
}

fn required<'a>(rows: &Subblock<'a>, header: &str) -> Result<&'a [String]> {
    rows.get(header)
        .copied()
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Missing row {}", header)))
}

/// Acquisition timestamps from the `Year`, `DOY(U)` and `UTC` rows of the times sub-block
pub fn read_times_subblock<'a, I>(lines: &mut I) -> Result<Vec<Timestamp>>
where
    I: Iterator<Item = &'a Line>,
{
    let rows = read_data_subblock(lines, HEADER_LOCAL);
    let years = required(&rows, HEADER_YEAR)?;
    let days = required(&rows, HEADER_DOY_UTC)?;
    let times = required(&rows, HEADER_UTC)?;

    if days.len() != years.len() || times.len() != years.len() {
        return Err(ProcessingError::InvalidFormat(format!(
            "Time rows differ in length: {} years, {} days, {} times",
            years.len(),
            days.len(),
            times.len()
        )));
    }

    years
        .iter()
        .zip(days)
        .zip(times)
        .map(|((year, day), hhmm)| timestamp_from_ordinal(year, day, hhmm))
        .collect()
}

/// Numeric weather rows, up to and including `Ang`
pub fn read_weather_subblock<'a, I>(lines: &mut I) -> Result<BTreeMap<WeatherField, Vec<f64>>>
where
    I: Iterator<Item = &'a Line>,
{
    let rows = read_data_subblock(lines, HEADER_ANGSTROM);

    WeatherField::ALL
        .iter()
        .map(|field| {
            let values = parse_floats(field.header(), required(&rows, field.header())?)?;
            Ok((*field, values))
        })
        .collect()
}

/// The single `Type:` row of aerosol type codes
pub fn read_aerosol_type_line<'a, I>(lines: &mut I) -> Result<Vec<AerosolType>>
where
    I: Iterator<Item = &'a Line>,
{
    let line = lines
        .next()
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Missing {} row", HEADER_TYPE)))?;

    match line.split_first() {
        Some((head, codes)) if header_key(head) == HEADER_TYPE => {
            codes.iter().map(|code| AerosolType::from_code(code)).collect()
        }
        _ => Err(ProcessingError::InvalidFormat(format!(
            "Unexpected header, expected {}: '{}'",
            HEADER_TYPE,
            line.first().map(String::as_str).unwrap_or_default()
        ))),
    }
}

/// All remaining rows, each headed by an integer wavelength
pub fn read_spectral_subblock<'a, I>(lines: &mut I) -> Result<BTreeMap<Wavelength, Vec<f64>>>
where
    I: Iterator<Item = &'a Line>,
{
    let mut rows = BTreeMap::new();

    for line in lines {
        let Some((head, values)) = line.split_first() else {
            continue;
        };
        let wavelength = head.trim().parse::<Wavelength>().map_err(|_| {
            ProcessingError::InvalidFormat(format!("Invalid wavelength header: '{}'", head))
        })?;

        if rows.insert(wavelength, parse_floats(head, values)?).is_some() {
            return Err(ProcessingError::InvalidFormat(format!(
                "Duplicate wavelength row {}",
                wavelength
            )));
        }
    }

    Ok(rows)
}

/// Decoded main data block
#[derive(Debug, Clone, PartialEq)]
pub struct MainDataBlock {
    pub times: Vec<Timestamp>,
    pub weather: BTreeMap<WeatherField, Vec<f64>>,
    pub aerosol_types: Vec<AerosolType>,
    pub spectral: BTreeMap<Wavelength, Vec<f64>>,
}

pub fn parse_main_data_block(block: &[Line]) -> Result<MainDataBlock> {
    let mut lines = block.iter();

    let times = read_times_subblock(&mut lines)?;
    let weather = read_weather_subblock(&mut lines)?;
    let aerosol_types = read_aerosol_type_line(&mut lines)?;
    let spectral = read_spectral_subblock(&mut lines)?;

    Ok(MainDataBlock {
        times,
        weather,
        aerosol_types,
        spectral,
    })
}

/// Decoded error data block: weather errors, then spectral errors
pub fn parse_error_data_block(
    block: &[Line],
) -> Result<(BTreeMap<WeatherField, Vec<f64>>, BTreeMap<Wavelength, Vec<f64>>)> {
    let mut lines = block.iter();

    let weather_errors = read_weather_subblock(&mut lines)?;
    let spectral_errors = read_spectral_subblock(&mut lines)?;

    Ok((weather_errors, spectral_errors))
}

/// Parse a complete daily file from a text stream
pub fn parse_daily_file<R: BufRead>(reader: R) -> Result<DailyFile> {
    let blocks = split_blocks(reader).collect::<Result<Vec<Block>>>()?;

    let [metadata, main, errors] = <[Block; DAILY_FILE_BLOCKS]>::try_from(blocks).map_err(|blocks| {
        ProcessingError::InvalidFormat(format!(
            "Expected {} blocks, found {}",
            DAILY_FILE_BLOCKS,
            blocks.len()
        ))
    })?;

    let header = parse_metadata_block(&metadata)?;
    let main = parse_main_data_block(&main)?;
    let (weather_errors, spectral_errors) = parse_error_data_block(&errors)?;

    let file = DailyFile {
        header,
        times: main.times,
        weather: main.weather,
        aerosol_types: main.aerosol_types,
        weather_errors,
        spectral: main.spectral,
        spectral_errors,
    };
    file.validate()?;

    Ok(file)
}
