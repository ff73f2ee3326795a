//! Application constants for the accident processor
//!
//! Built-in defaults and the source column names of the raw accident export.

// =============================================================================
// Pipeline Defaults
// =============================================================================

/// Rows per chunk; bounds peak memory to a few GB on the full export
pub const DEFAULT_CHUNK_SIZE: usize = 2_600_000;

/// Records before this date are excluded from the warehouse
pub const DEFAULT_DATE_CUTOFF: &str = "2018-01-01";

/// Longest trimmed value allowed in a quality-checked text column
pub const DEFAULT_MAX_STRING_LENGTH: usize = 50;

/// Fraction of invalid values in one column of one chunk that aborts the run
pub const DEFAULT_MAX_INVALID_FRACTION: f64 = 1.0;

/// Columns removed before any other processing unless overridden
pub const DEFAULT_DELETE_COLUMNS: &[&str] = &[
    "ID",
    "Description",
    "End_Lat",
    "End_Lng",
    "Weather_Timestamp",
];

/// Literal used for missing text in non-nullable string columns
pub const UNKNOWN_TEXT: &str = "Unknown";

/// Table name used in the generated CREATE TABLE script
pub const SQL_TABLE_NAME: &str = "US_Accidents";

/// Suffix of the default output file name
pub const OUTPUT_SUFFIX: &str = "-cleaned";

/// Suffix of the default report file name
pub const REPORT_SUFFIX: &str = "_report";

/// Memory usage ratio above which a smaller chunk size is suggested
pub const MEMORY_PRESSURE_THRESHOLD: f64 = 0.8;

// =============================================================================
// Source Columns
// =============================================================================

pub mod source_columns {
    pub const ID: &str = "ID";
    pub const SOURCE: &str = "Source";
    pub const SEVERITY: &str = "Severity";
    pub const START_TIME: &str = "Start_Time";
    pub const END_TIME: &str = "End_Time";
    pub const START_LAT: &str = "Start_Lat";
    pub const START_LNG: &str = "Start_Lng";
    pub const END_LAT: &str = "End_Lat";
    pub const END_LNG: &str = "End_Lng";
    pub const DISTANCE: &str = "Distance(mi)";
    pub const DESCRIPTION: &str = "Description";
    pub const STREET: &str = "Street";
    pub const CITY: &str = "City";
    pub const COUNTY: &str = "County";
    pub const STATE: &str = "State";
    pub const ZIPCODE: &str = "Zipcode";
    pub const COUNTRY: &str = "Country";
    pub const TIMEZONE: &str = "Timezone";
    pub const AIRPORT_CODE: &str = "Airport_Code";
    pub const WEATHER_TIMESTAMP: &str = "Weather_Timestamp";
    pub const TEMPERATURE: &str = "Temperature(F)";
    pub const WIND_CHILL: &str = "Wind_Chill(F)";
    pub const HUMIDITY: &str = "Humidity(%)";
    pub const PRESSURE: &str = "Pressure(in)";
    pub const VISIBILITY: &str = "Visibility(mi)";
    pub const WIND_DIRECTION: &str = "Wind_Direction";
    pub const WIND_SPEED: &str = "Wind_Speed(mph)";
    pub const PRECIPITATION: &str = "Precipitation(in)";
    pub const WEATHER_CONDITION: &str = "Weather_Condition";
    pub const AMENITY: &str = "Amenity";
    pub const BUMP: &str = "Bump";
    pub const CROSSING: &str = "Crossing";
    pub const GIVE_WAY: &str = "Give_Way";
    pub const JUNCTION: &str = "Junction";
    pub const NO_EXIT: &str = "No_Exit";
    pub const RAILWAY: &str = "Railway";
    pub const ROUNDABOUT: &str = "Roundabout";
    pub const STATION: &str = "Station";
    pub const STOP: &str = "Stop";
    pub const TRAFFIC_CALMING: &str = "Traffic_Calming";
    pub const TRAFFIC_SIGNAL: &str = "Traffic_Signal";
    pub const TURNING_LOOP: &str = "Turning_Loop";
    pub const SUNRISE_SUNSET: &str = "Sunrise_Sunset";
    pub const CIVIL_TWILIGHT: &str = "Civil_Twilight";
    pub const NAUTICAL_TWILIGHT: &str = "Nautical_Twilight";
    pub const ASTRONOMICAL_TWILIGHT: &str = "Astronomical_Twilight";
}

/// Timestamp layouts seen in the export, tried in order
pub const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Valid accident severity levels
pub const SEVERITY_RANGE: std::ops::RangeInclusive<i64> = 1..=4;

/// Decimal places used for the near-duplicate location key
pub const DEDUP_COORDINATE_SCALE: f64 = 10_000.0;
