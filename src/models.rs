//! Core data structures and types for accident dataset processing.
//!
//! Defines the semantic column types, column descriptors, derivation kinds
//! and pipeline phases shared by the catalog, the transforms and the driver.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer widths available for type narrowing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntegerWidth {
    I8,
    I16,
    I32,
}

impl IntegerWidth {
    /// Inclusive representable range
    pub fn range(&self) -> (i64, i64) {
        match self {
            IntegerWidth::I8 => (i8::MIN as i64, i8::MAX as i64),
            IntegerWidth::I16 => (i16::MIN as i64, i16::MAX as i64),
            IntegerWidth::I32 => (i32::MIN as i64, i32::MAX as i64),
        }
    }
}

/// Target semantic type of an output column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SemanticType {
    NarrowInteger(IntegerWidth),
    Decimal { precision: u32, scale: u32 },
    Boolean,
    BoundedString { max_len: usize },
}

impl SemanticType {
    /// SQL Server column type this semantic type is loaded into
    pub fn sql_type(&self) -> String {
        match self {
            SemanticType::NarrowInteger(IntegerWidth::I8) => "TINYINT".to_string(),
            SemanticType::NarrowInteger(IntegerWidth::I16) => "SMALLINT".to_string(),
            SemanticType::NarrowInteger(IntegerWidth::I32) => "INT".to_string(),
            SemanticType::Decimal { precision, scale } => {
                format!("DECIMAL({},{})", precision, scale)
            }
            SemanticType::Boolean => "BIT".to_string(),
            SemanticType::BoundedString { max_len } => format!("NVARCHAR({})", max_len),
        }
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, SemanticType::BoundedString { .. })
    }
}

/// Value substituted for a null in a non-nullable column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Text(String),
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Integer(v) => write!(f, "{}", v),
            DefaultValue::Decimal(v) => write!(f, "{}", v),
            DefaultValue::Boolean(v) => write!(f, "{}", u8::from(*v)),
            DefaultValue::Text(v) => write!(f, "'{}'", v),
        }
    }
}

/// Star-schema group a column belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dimension {
    Fact,
    Time,
    Location,
    Weather,
    Environment,
    Event,
    Auxiliary,
}

/// How a derived column is computed from the chunk's timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DerivationKind {
    Year,
    Quarter,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    IsWeekend,
    Duration,
}

/// Where a column's values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnOrigin {
    Source,
    Derived(DerivationKind),
}

/// Static description of one output column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name as it appears in the chunk before renaming
    pub source_name: String,
    /// Column name in the output file
    pub target_name: String,
    pub semantic_type: SemanticType,
    pub nullable: bool,
    pub default_for_null: Option<DefaultValue>,
    pub dimension: Dimension,
    pub origin: ColumnOrigin,
}

impl ColumnDescriptor {
    pub fn is_derived(&self) -> bool {
        matches!(self.origin, ColumnOrigin::Derived(_))
    }

    /// Textual default applied during string normalisation, if any
    pub fn text_default(&self) -> Option<&str> {
        match &self.default_for_null {
            Some(DefaultValue::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Pipeline phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Read,
    DropColumns,
    DeriveFeatures,
    FilterRows,
    CoerceTypes,
    NormalizeStrings,
    RenameColumns,
    ReorderColumns,
    Write,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Read => "read",
            Phase::DropColumns => "drop columns",
            Phase::DeriveFeatures => "derive features",
            Phase::FilterRows => "filter rows",
            Phase::CoerceTypes => "coerce types",
            Phase::NormalizeStrings => "normalize strings",
            Phase::RenameColumns => "rename columns",
            Phase::ReorderColumns => "reorder columns",
            Phase::Write => "write",
        };
        f.write_str(name)
    }
}
