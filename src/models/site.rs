use crate::error::{ProcessingError, Result};
use crate::utils::constants::SITE_CODE_LEN;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Registry of network sites recognized in filenames
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SiteCode {
    Rvus,
    Lcfr,
    Btcn,
    Gona,
}

impl SiteCode {
    pub const ALL: [SiteCode; 4] = [SiteCode::Rvus, SiteCode::Lcfr, SiteCode::Btcn, SiteCode::Gona];

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "RVUS" => Some(SiteCode::Rvus),
            "LCFR" => Some(SiteCode::Lcfr),
            "BTCN" => Some(SiteCode::Btcn),
            "GONA" => Some(SiteCode::Gona),
            _ => None,
        }
    }

    /// Site code from the leading letters of an instrument code (e.g. BTCN02)
    pub fn from_instrument(instrument: &str) -> Result<Self> {
        instrument
            .get(..SITE_CODE_LEN)
            .and_then(Self::from_code)
            .ok_or_else(|| ProcessingError::UnknownSite(instrument.to_string()))
    }

    pub fn code(&self) -> &'static str {
        match self {
            SiteCode::Rvus => "RVUS",
            SiteCode::Lcfr => "LCFR",
            SiteCode::Btcn => "BTCN",
            SiteCode::Gona => "GONA",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SiteCode::Rvus => "Railroad Valley, United States",
            SiteCode::Lcfr => "La Crau, France",
            SiteCode::Btcn => "Baotou, China",
            SiteCode::Gona => "Gobabeb, Namibia",
        }
    }
}

impl fmt::Display for SiteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Coordinates {
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    /// Metres above sea level
    pub altitude: f64,
}

impl Coordinates {
    pub fn new(longitude: f64, latitude: f64, altitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            altitude,
        }
    }
}

/// Identity and location of the instrument a set of measurements came from.
///
/// Starts empty (or seeded with an instrument) and is filled from the first daily
/// file processed; every later file must agree with it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteMetadata {
    pub site: Option<String>,
    pub instrument: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl SiteMetadata {
    pub fn for_instrument(instrument: &str) -> Self {
        Self {
            site: Some(instrument.chars().take(SITE_CODE_LEN).collect()),
            instrument: Some(instrument.to_string()),
            coordinates: None,
        }
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    /// Registry entry for the site, when it is a known one
    pub fn site_code(&self) -> Option<SiteCode> {
        self.site.as_deref().and_then(SiteCode::from_code)
    }

    pub fn is_empty(&self) -> bool {
        self.site.is_none() && self.instrument.is_none() && self.coordinates.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_registry() {
        for site in SiteCode::ALL {
            assert_eq!(SiteCode::from_code(site.code()), Some(site));
        }
        assert_eq!(SiteCode::Btcn.name(), "Baotou, China");
        assert_eq!(SiteCode::from_code("ABCD"), None);
    }

    #[test]
    fn test_site_from_instrument() {
        assert_eq!(SiteCode::from_instrument("GONA01").unwrap(), SiteCode::Gona);
        assert!(matches!(
            SiteCode::from_instrument("ABCD00"),
            Err(ProcessingError::UnknownSite(_))
        ));
        assert!(SiteCode::from_instrument("BT").is_err());
    }

    #[test]
    fn test_coordinates_validation() {
        assert!(Coordinates::new(109.6272, 40.85486, 1270.0).validate().is_ok());
        assert!(Coordinates::new(109.6272, 91.0, 1270.0).validate().is_err());
        assert!(Coordinates::new(-181.0, 40.0, 0.0).validate().is_err());
    }

    #[test]
    fn test_seeded_metadata() {
        let meta = SiteMetadata::for_instrument("BTCN02");
        assert_eq!(meta.site.as_deref(), Some("BTCN"));
        assert_eq!(meta.instrument.as_deref(), Some("BTCN02"));
        assert_eq!(meta.site_code(), Some(SiteCode::Btcn));
        assert!(meta.coordinates.is_none());
        assert!(!meta.is_empty());
        assert!(SiteMetadata::default().is_empty());

        let unknown = SiteMetadata::for_instrument("ABCD00");
        assert_eq!(unknown.site_code(), None);
    }
}
