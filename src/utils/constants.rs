/// Decoded values at or above this threshold mark invalid or missing data
pub const SENTINEL_THRESHOLD: f64 = 9000.0;

/// Spectral grid of the reflectance and uncertainty tables (nm)
pub const MIN_WAVELENGTH: u16 = 400;
pub const MAX_WAVELENGTH: u16 = 2500;
pub const WAVELENGTH_STEP: u16 = 10;

/// Number of blocks in a daily file: metadata, main data, errors
pub const DAILY_FILE_BLOCKS: usize = 3;

/// Metadata block keys
pub const META_SITE: &str = "Site";
pub const META_LATITUDE: &str = "Lat";
pub const META_LONGITUDE: &str = "Lon";
pub const META_ALTITUDE: &str = "Alt";

/// Length of the instrument code carried by the `Site` metadata key (e.g. BTCN02)
pub const INSTRUMENT_CODE_LEN: usize = 6;
pub const SITE_CODE_LEN: usize = 4;

/// Data block headers
pub const HEADER_YEAR: &str = "Year";
pub const HEADER_DOY_UTC: &str = "DOY(U)";
pub const HEADER_UTC: &str = "UTC";
pub const HEADER_LOCAL: &str = "Local";
pub const HEADER_ANGSTROM: &str = "Ang";
pub const HEADER_TYPE: &str = "Type";

/// Daily file stage extensions
pub const STAGE_INPUT: &str = "input";
pub const STAGE_OUTPUT: &str = "output";

/// Processing defaults
pub const DEFAULT_MAX_WORKERS: usize = 1;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 4; // 32KB
pub const SETTINGS_ENV_PREFIX: &str = "RADCALNET";

/// Export file names
pub const WEATHER_FILE: &str = "weather.csv";
pub const WEATHER_ERRORS_FILE: &str = "weather_errs.csv";
pub const SR_FILE: &str = "sr.csv";
pub const SR_ERRORS_FILE: &str = "sr_errs.csv";
pub const TOA_FILE: &str = "toa.csv";
pub const TOA_ERRORS_FILE: &str = "toa_errs.csv";
