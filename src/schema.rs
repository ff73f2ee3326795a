//! Schema catalog for the accident star schema.
//!
//! Holds the static description of every source, derived and target column:
//! semantic type, nullability, default, dimension and output position. The
//! catalog is built once from the built-in table plus configuration overrides
//! and is read-only afterwards.

use crate::config::PipelineConfig;
use crate::constants::{DEFAULT_DELETE_COLUMNS, UNKNOWN_TEXT, source_columns as src};
use crate::error::{ProcessorError, Result};
use crate::models::{
    ColumnDescriptor, ColumnOrigin, DefaultValue, DerivationKind, Dimension, IntegerWidth,
    SemanticType,
};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

const TINYINT: SemanticType = SemanticType::NarrowInteger(IntegerWidth::I8);
const SMALLINT: SemanticType = SemanticType::NarrowInteger(IntegerWidth::I16);
const INT: SemanticType = SemanticType::NarrowInteger(IntegerWidth::I32);
const COORDINATE: SemanticType = SemanticType::Decimal {
    precision: 9,
    scale: 6,
};
const MEASURE: SemanticType = SemanticType::Decimal {
    precision: 8,
    scale: 4,
};
const TEXT: SemanticType = SemanticType::BoundedString { max_len: 100 };
const LONG_TEXT: SemanticType = SemanticType::BoundedString { max_len: 4000 };

/// Text columns checked by the length quality filter unless overridden
const DEFAULT_QUALITY_COLUMNS: &[&str] = &[
    src::SOURCE,
    src::STREET,
    src::CITY,
    src::COUNTY,
    src::STATE,
    src::ZIPCODE,
    src::COUNTRY,
    src::TIMEZONE,
    src::AIRPORT_CODE,
    src::WIND_DIRECTION,
    src::WEATHER_CONDITION,
    src::SUNRISE_SUNSET,
    src::CIVIL_TWILIGHT,
    src::NAUTICAL_TWILIGHT,
    src::ASTRONOMICAL_TWILIGHT,
];

/// Explicit renames applied after canonicalisation
const RENAME_OVERRIDES: &[(&str, &str)] = &[("START_LAT", "LATITUDE"), ("START_LNG", "LONGITUDE")];

/// A column computed by the feature deriver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedColumn {
    pub name: String,
    pub kind: DerivationKind,
}

/// Canonicalises raw export headers into warehouse column names
#[derive(Debug, Clone)]
pub struct ColumnNamer {
    units: Regex,
    whitespace: Regex,
    underscores: Regex,
    overrides: HashMap<&'static str, &'static str>,
}

impl ColumnNamer {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                ProcessorError::configuration(format!("invalid column name pattern: {}", e))
            })
        };

        Ok(Self {
            units: compile(r"\([^)]*\)")?,
            whitespace: compile(r"\s+")?,
            underscores: compile(r"_+")?,
            overrides: RENAME_OVERRIDES.iter().copied().collect(),
        })
    }

    /// `Distance(mi)` -> `DISTANCE`, `Start_Lat` -> `LATITUDE`
    pub fn canonical_name(&self, raw: &str) -> String {
        let upper = raw.to_uppercase();
        let without_units = self.units.replace_all(&upper, "");
        let joined = self.whitespace.replace_all(without_units.trim(), "_");
        let collapsed = self.underscores.replace_all(&joined, "_");
        let name = collapsed.trim_matches('_');

        match self.overrides.get(name) {
            Some(renamed) => renamed.to_string(),
            None => name.to_string(),
        }
    }
}

/// Read-only lookup of columns, types, renames and output order
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    descriptors: Vec<ColumnDescriptor>,
    by_source: HashMap<String, usize>,
    by_target: HashMap<String, usize>,
    columns_to_drop: Vec<String>,
    drop_list_overridden: bool,
    derived: Vec<DerivedColumn>,
    consumed: Vec<String>,
    end_timestamp: Option<String>,
    quality_columns: Vec<String>,
    quality_columns_overridden: bool,
    target_order: Vec<String>,
    namer: ColumnNamer,
}

impl SchemaCatalog {
    /// Build the catalog from the built-in table and configuration overrides
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let namer = ColumnNamer::new()?;

        let (columns_to_drop, drop_list_overridden) = match &config.delete_columns {
            Some(columns) => (
                columns.iter().map(|c| c.trim().to_string()).collect::<Vec<_>>(),
                true,
            ),
            None => (
                DEFAULT_DELETE_COLUMNS
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>(),
                false,
            ),
        };
        let dropped: HashSet<&str> = columns_to_drop.iter().map(String::as_str).collect();

        if dropped.contains(src::START_TIME) {
            return Err(ProcessorError::configuration(format!(
                "{} is the primary timestamp and cannot be deleted",
                src::START_TIME
            )));
        }

        let end_timestamp = if dropped.contains(src::END_TIME) {
            debug!("{} deleted: DURATION will not be derived", src::END_TIME);
            None
        } else {
            Some(src::END_TIME.to_string())
        };

        let mut derivations = config.time_features.kinds();
        if end_timestamp.is_some() {
            derivations.push(DerivationKind::Duration);
        }

        let descriptors: Vec<ColumnDescriptor> = builtin_columns(&namer)
            .into_iter()
            .filter(|descriptor| match descriptor.origin {
                ColumnOrigin::Source => !dropped.contains(descriptor.source_name.as_str()),
                ColumnOrigin::Derived(kind) => derivations.contains(&kind),
            })
            .collect();

        let derived = descriptors
            .iter()
            .filter_map(|descriptor| match descriptor.origin {
                ColumnOrigin::Derived(kind) => Some(DerivedColumn {
                    name: descriptor.target_name.clone(),
                    kind,
                }),
                ColumnOrigin::Source => None,
            })
            .collect();

        let mut consumed = vec![src::START_TIME.to_string()];
        if let Some(end) = &end_timestamp {
            consumed.push(end.clone());
        }

        let (quality_columns, quality_columns_overridden) = match &config.quality_columns {
            Some(columns) => (columns.iter().map(|c| c.trim().to_string()).collect(), true),
            None => (
                DEFAULT_QUALITY_COLUMNS
                    .iter()
                    .filter(|name| !dropped.contains(**name))
                    .map(|name| name.to_string())
                    .collect(),
                false,
            ),
        };

        let by_source = descriptors
            .iter()
            .enumerate()
            .map(|(index, d)| (d.source_name.clone(), index))
            .collect();
        let by_target = descriptors
            .iter()
            .enumerate()
            .map(|(index, d)| (d.target_name.clone(), index))
            .collect();
        let target_order = descriptors.iter().map(|d| d.target_name.clone()).collect();

        Ok(Self {
            descriptors,
            by_source,
            by_target,
            columns_to_drop,
            drop_list_overridden,
            derived,
            consumed,
            end_timestamp,
            quality_columns,
            quality_columns_overridden,
            target_order,
            namer,
        })
    }

    /// Check the source header against the catalog before any chunk is read
    pub fn validate_header(&self, header: &[String], path: &Path) -> Result<()> {
        let malformed = |reason: String| ProcessorError::MalformedHeader {
            path: path.to_path_buf(),
            reason,
        };

        if header.is_empty() || header.iter().all(|name| name.trim().is_empty()) {
            return Err(malformed("header row is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for name in header {
            if !seen.insert(name.as_str()) {
                return Err(malformed(format!("duplicate column '{}'", name)));
            }
        }

        if !seen.contains(src::START_TIME) {
            return Err(malformed(format!(
                "primary timestamp column '{}' is missing",
                src::START_TIME
            )));
        }

        if self.drop_list_overridden {
            if let Some(unknown) = self
                .columns_to_drop
                .iter()
                .find(|name| !seen.contains(name.as_str()))
            {
                return Err(ProcessorError::configuration(format!(
                    "delete column '{}' does not exist in the source header",
                    unknown
                )));
            }
        }

        if self.quality_columns_overridden {
            if let Some(unknown) = self
                .quality_columns
                .iter()
                .find(|name| !seen.contains(name.as_str()))
            {
                return Err(ProcessorError::configuration(format!(
                    "quality column '{}' does not exist in the source header",
                    unknown
                )));
            }
        }

        let missing: Vec<&str> = self
            .descriptors
            .iter()
            .filter(|d| !d.is_derived() && !seen.contains(d.source_name.as_str()))
            .map(|d| d.source_name.as_str())
            .collect();
        if !missing.is_empty() {
            warn!(
                "Source header lacks {} catalog columns: {:?}",
                missing.len(),
                missing
            );
        }

        Ok(())
    }

    /// Source columns removed in the first phase
    pub fn columns_to_drop(&self) -> &[String] {
        &self.columns_to_drop
    }

    /// Columns added by feature derivation, in output order
    pub fn derived_columns(&self) -> &[DerivedColumn] {
        &self.derived
    }

    /// Timestamp columns removed once features are derived
    pub fn consumed_columns(&self) -> &[String] {
        &self.consumed
    }

    /// Exact output header for this run
    pub fn target_order(&self) -> &[String] {
        &self.target_order
    }

    pub fn type_of(&self, target_name: &str) -> Option<SemanticType> {
        self.by_target
            .get(target_name)
            .map(|&index| self.descriptors[index].semantic_type)
    }

    pub fn descriptor(&self, target_name: &str) -> Option<&ColumnDescriptor> {
        self.by_target
            .get(target_name)
            .map(|&index| &self.descriptors[index])
    }

    pub fn descriptor_for_source(&self, source_name: &str) -> Option<&ColumnDescriptor> {
        self.by_source
            .get(source_name)
            .map(|&index| &self.descriptors[index])
    }

    /// Descriptors of every output column, in output order
    pub fn descriptors(&self) -> &[ColumnDescriptor] {
        &self.descriptors
    }

    /// Output name for a chunk column; unmapped columns keep their canonical name
    pub fn target_name_for(&self, source_name: &str) -> String {
        match self.descriptor_for_source(source_name) {
            Some(descriptor) => descriptor.target_name.clone(),
            None => self.namer.canonical_name(source_name),
        }
    }

    pub fn primary_timestamp(&self) -> &str {
        src::START_TIME
    }

    pub fn end_timestamp(&self) -> Option<&str> {
        self.end_timestamp.as_deref()
    }

    pub fn severity_column(&self) -> &str {
        src::SEVERITY
    }

    /// Latitude and longitude source columns used for near-duplicate keys
    pub fn location_columns(&self) -> (&str, &str) {
        (src::START_LAT, src::START_LNG)
    }

    pub fn quality_columns(&self) -> &[String] {
        &self.quality_columns
    }
}

fn source_column(
    namer: &ColumnNamer,
    name: &str,
    dimension: Dimension,
    semantic_type: SemanticType,
    default_for_null: Option<DefaultValue>,
) -> ColumnDescriptor {
    ColumnDescriptor {
        source_name: name.to_string(),
        target_name: namer.canonical_name(name),
        semantic_type,
        nullable: default_for_null.is_none(),
        default_for_null,
        dimension,
        origin: ColumnOrigin::Source,
    }
}

fn derived_column(
    name: &str,
    kind: DerivationKind,
    dimension: Dimension,
    semantic_type: SemanticType,
) -> ColumnDescriptor {
    let default_for_null = match semantic_type {
        SemanticType::Boolean => DefaultValue::Boolean(false),
        _ => DefaultValue::Integer(0),
    };
    ColumnDescriptor {
        source_name: name.to_string(),
        target_name: name.to_string(),
        semantic_type,
        nullable: false,
        default_for_null: Some(default_for_null),
        dimension,
        origin: ColumnOrigin::Derived(kind),
    }
}

/// Every column the catalog knows about, in star-schema order
fn builtin_columns(namer: &ColumnNamer) -> Vec<ColumnDescriptor> {
    use DerivationKind as K;
    use Dimension::*;

    let unknown = || Some(DefaultValue::Text(UNKNOWN_TEXT.to_string()));
    let zero = || Some(DefaultValue::Decimal(0.0));
    let no = || Some(DefaultValue::Boolean(false));

    let mut columns = vec![
        // Fact measures
        source_column(namer, src::SEVERITY, Fact, TINYINT, Some(DefaultValue::Integer(0))),
        source_column(namer, src::DISTANCE, Fact, MEASURE, zero()),
        derived_column("DURATION", K::Duration, Fact, INT),
        // Time dimension
        derived_column("YEAR", K::Year, Time, SMALLINT),
        derived_column("QUARTER", K::Quarter, Time, TINYINT),
        derived_column("MONTH", K::Month, Time, TINYINT),
        derived_column("DAY", K::Day, Time, TINYINT),
        derived_column("HOUR", K::Hour, Time, TINYINT),
        derived_column("MINUTE", K::Minute, Time, TINYINT),
        derived_column("SECOND", K::Second, Time, TINYINT),
        derived_column("IS_WEEKEND", K::IsWeekend, Time, SemanticType::Boolean),
        // Location dimension
        source_column(namer, src::START_LAT, Location, COORDINATE, zero()),
        source_column(namer, src::START_LNG, Location, COORDINATE, zero()),
        source_column(namer, src::STREET, Location, TEXT, unknown()),
        source_column(namer, src::CITY, Location, TEXT, unknown()),
        source_column(namer, src::COUNTY, Location, TEXT, unknown()),
        source_column(namer, src::STATE, Location, TEXT, unknown()),
        source_column(namer, src::ZIPCODE, Location, TEXT, unknown()),
        source_column(namer, src::COUNTRY, Location, TEXT, unknown()),
        source_column(namer, src::TIMEZONE, Location, TEXT, unknown()),
        source_column(namer, src::AIRPORT_CODE, Location, TEXT, unknown()),
        // Weather dimension
        source_column(namer, src::TEMPERATURE, Weather, MEASURE, None),
        source_column(namer, src::WIND_CHILL, Weather, MEASURE, None),
        source_column(namer, src::HUMIDITY, Weather, MEASURE, None),
        source_column(namer, src::PRESSURE, Weather, MEASURE, None),
        source_column(namer, src::VISIBILITY, Weather, MEASURE, None),
        source_column(namer, src::WIND_DIRECTION, Weather, TEXT, unknown()),
        source_column(namer, src::WIND_SPEED, Weather, MEASURE, None),
        source_column(namer, src::PRECIPITATION, Weather, MEASURE, None),
        source_column(namer, src::WEATHER_CONDITION, Weather, TEXT, unknown()),
    ];

    // Environment dimension
    for flag in [
        src::AMENITY,
        src::BUMP,
        src::CROSSING,
        src::GIVE_WAY,
        src::JUNCTION,
        src::NO_EXIT,
        src::RAILWAY,
        src::ROUNDABOUT,
        src::STATION,
        src::STOP,
        src::TRAFFIC_CALMING,
        src::TRAFFIC_SIGNAL,
        src::TURNING_LOOP,
    ] {
        columns.push(source_column(
            namer,
            flag,
            Environment,
            SemanticType::Boolean,
            no(),
        ));
    }
    for light in [
        src::SUNRISE_SUNSET,
        src::CIVIL_TWILIGHT,
        src::NAUTICAL_TWILIGHT,
        src::ASTRONOMICAL_TWILIGHT,
    ] {
        columns.push(source_column(namer, light, Environment, TEXT, unknown()));
    }

    columns.push(source_column(namer, src::SOURCE, Event, TEXT, unknown()));

    // Only present when the drop list keeps them
    columns.push(source_column(namer, src::ID, Auxiliary, TEXT, unknown()));
    columns.push(source_column(
        namer,
        src::DESCRIPTION,
        Auxiliary,
        LONG_TEXT,
        unknown(),
    ));
    columns.push(source_column(namer, src::END_LAT, Auxiliary, COORDINATE, None));
    columns.push(source_column(namer, src::END_LNG, Auxiliary, COORDINATE, None));
    columns.push(source_column(
        namer,
        src::WEATHER_TIMESTAMP,
        Auxiliary,
        TEXT,
        None,
    ));

    columns
}
