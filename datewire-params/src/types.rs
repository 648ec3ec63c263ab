//! Parameter types

use datewire_core::{PackedDateTime, Temporal};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ParamError;

// ============================================================================
// SqlType
// ============================================================================

/// Portable SQL type of a bound parameter, keyed by its JDBC type code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum SqlType {
    Bit = -7,
    TinyInt = -6,
    SmallInt = 5,
    Integer = 4,
    BigInt = -5,
    Float = 6,
    Real = 7,
    Double = 8,
    Numeric = 2,
    Decimal = 3,
    Char = 1,
    Varchar = 12,
    LongVarchar = -1,
    Date = 91,
    Time = 92,
    Timestamp = 93,
    Binary = -2,
    Varbinary = -3,
    LongVarbinary = -4,
    Null = 0,
    Other = 1111,
}

impl SqlType {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            SqlType::Bit => "BIT",
            SqlType::TinyInt => "TINYINT",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Float => "FLOAT",
            SqlType::Real => "REAL",
            SqlType::Double => "DOUBLE",
            SqlType::Numeric => "NUMERIC",
            SqlType::Decimal => "DECIMAL",
            SqlType::Char => "CHAR",
            SqlType::Varchar => "VARCHAR",
            SqlType::LongVarchar => "LONGVARCHAR",
            SqlType::Date => "DATE",
            SqlType::Time => "TIME",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Binary => "BINARY",
            SqlType::Varbinary => "VARBINARY",
            SqlType::LongVarbinary => "LONGVARBINARY",
            SqlType::Null => "NULL",
            SqlType::Other => "OTHER",
        }
    }
}

impl TryFrom<i32> for SqlType {
    type Error = ParamError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        let sql_type = match code {
            -7 => SqlType::Bit,
            -6 => SqlType::TinyInt,
            5 => SqlType::SmallInt,
            4 => SqlType::Integer,
            -5 => SqlType::BigInt,
            6 => SqlType::Float,
            7 => SqlType::Real,
            8 => SqlType::Double,
            2 => SqlType::Numeric,
            3 => SqlType::Decimal,
            1 => SqlType::Char,
            12 => SqlType::Varchar,
            -1 => SqlType::LongVarchar,
            91 => SqlType::Date,
            92 => SqlType::Time,
            93 => SqlType::Timestamp,
            -2 => SqlType::Binary,
            -3 => SqlType::Varbinary,
            -4 => SqlType::LongVarbinary,
            0 => SqlType::Null,
            1111 => SqlType::Other,
            other => return Err(ParamError::UnknownType(other)),
        };
        Ok(sql_type)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// ParamValue
// ============================================================================

/// Value bound to a parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    #[default]
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Temporal(Temporal),
}

impl ParamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Null => "Null",
            ParamValue::Text(_) => "Text",
            ParamValue::Integer(_) => "Integer",
            ParamValue::Float(_) => "Float",
            ParamValue::Bool(_) => "Bool",
            ParamValue::Bytes(_) => "Bytes",
            ParamValue::Temporal(t) => t.type_name(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<i32> for ParamValue {
    fn from(n: i32) -> Self {
        ParamValue::Integer(i64::from(n))
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Integer(n)
    }
}

impl From<Temporal> for ParamValue {
    fn from(t: Temporal) -> Self {
        ParamValue::Temporal(t)
    }
}

// ============================================================================
// ParameterListItem
// ============================================================================

/// Declared maximum length of a formal parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxLength {
    Bounded(u32),
    Unbounded,
}

/// One bound parameter of a prepared statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterListItem {
    pub sql_type: SqlType,

    #[serde(default)]
    pub value: ParamValue,

    #[serde(default)]
    pub is_set: bool,

    #[serde(default)]
    pub is_output: bool,

    /// Formal name without the `@`, assigned by the mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formal_name: Option<String>,

    /// Server type in declaration syntax, assigned by the mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formal_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<MaxLength>,
}

impl ParameterListItem {
    /// An unset input parameter
    pub fn new(sql_type: SqlType) -> Self {
        Self {
            sql_type,
            value: ParamValue::Null,
            is_set: false,
            is_output: false,
            formal_name: None,
            formal_type: None,
            max_length: None,
        }
    }

    /// An input parameter bound to `value`
    pub fn bound(sql_type: SqlType, value: impl Into<ParamValue>) -> Self {
        let mut item = Self::new(sql_type);
        item.set(value);
        item
    }

    /// An output parameter
    pub fn output(sql_type: SqlType) -> Self {
        let mut item = Self::new(sql_type);
        item.is_output = true;
        item
    }

    pub fn set(&mut self, value: impl Into<ParamValue>) {
        self.value = value.into();
        self.is_set = true;
    }

    /// Encode a temporal value for the wire
    ///
    /// The declared type picks the packed shape: a `Date` parameter drops
    /// the time of a timestamp value, a `Time` parameter drops its date.
    /// Returns `None` for a null value.
    pub fn packed_datetime(&self) -> Result<Option<PackedDateTime>, ParamError> {
        let value = match &self.value {
            ParamValue::Null => return Ok(None),
            ParamValue::Temporal(t) => t,
            other => return Err(ParamError::NotTemporal { found: other.type_name() }),
        };

        let packed = match (self.sql_type, value) {
            (SqlType::Date, Temporal::Timestamp(ts)) => PackedDateTime::from_date(&ts.date())?,
            (SqlType::Time, Temporal::Timestamp(ts)) => PackedDateTime::from_time_of(ts)?,
            (_, value) => PackedDateTime::from_temporal(value)?,
        };
        Ok(Some(packed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datewire_core::PackError;

    fn temporal(s: &str) -> ParamValue {
        ParamValue::Temporal(Temporal::parse(s).unwrap())
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(SqlType::try_from(12), Ok(SqlType::Varchar));
        assert_eq!(SqlType::try_from(93), Ok(SqlType::Timestamp));
        assert_eq!(SqlType::try_from(-7), Ok(SqlType::Bit));
        assert_eq!(SqlType::try_from(42), Err(ParamError::UnknownType(42)));
        assert_eq!(SqlType::LongVarbinary.code(), -4);
        for code in [-7, -6, -5, -4, -3, -2, -1, 0, 1, 2, 3, 4, 5, 6, 7, 8, 12, 91, 92, 93, 1111] {
            assert_eq!(SqlType::try_from(code).unwrap().code(), code);
        }
    }

    #[test]
    fn test_item_builders() {
        let item = ParameterListItem::new(SqlType::Integer);
        assert!(!item.is_set);

        let item = ParameterListItem::bound(SqlType::Integer, 7);
        assert!(item.is_set);
        assert_eq!(item.value, ParamValue::Integer(7));

        let item = ParameterListItem::output(SqlType::Varchar);
        assert!(item.is_output);
        assert!(item.value.is_null());
    }

    #[test]
    fn test_packed_datetime_by_declared_type() {
        let item = ParameterListItem::bound(SqlType::Timestamp, temporal("2000-02-29 10:00"));
        let packed = item.packed_datetime().unwrap().unwrap();
        assert_eq!(packed.to_canonical_string(), "2000-02-29 10:00:00.0");

        let item = ParameterListItem::bound(SqlType::Date, temporal("2000-02-29 10:00"));
        let packed = item.packed_datetime().unwrap().unwrap();
        assert!(packed.is_time_absent());
        assert_eq!(packed.to_canonical_string(), "2000-02-29");

        let item = ParameterListItem::bound(SqlType::Time, temporal("2000-02-29 10:00"));
        let packed = item.packed_datetime().unwrap().unwrap();
        assert!(packed.is_date_absent());
        assert_eq!(packed.to_canonical_string(), "10:00:00.0");
    }

    #[test]
    fn test_packed_datetime_errors() {
        let item = ParameterListItem::bound(SqlType::Timestamp, temporal("1700-01-01"));
        assert_eq!(
            item.packed_datetime(),
            Err(ParamError::Pack(PackError::YearRange { year: 1700 }))
        );

        let item = ParameterListItem::bound(SqlType::Time, temporal("-0001-01-01 10:00"));
        assert_eq!(
            item.packed_datetime(),
            Err(ParamError::Pack(PackError::EraRange { year: -1 }))
        );

        let item = ParameterListItem::bound(SqlType::Timestamp, "2000-01-01");
        assert_eq!(item.packed_datetime(), Err(ParamError::NotTemporal { found: "Text" }));

        let item = ParameterListItem::new(SqlType::Timestamp);
        assert_eq!(item.packed_datetime(), Ok(None));
    }

    #[test]
    fn test_item_deserialize_defaults() {
        let item: ParameterListItem =
            serde_json::from_str(r#"{"sql_type":"varchar","value":{"type":"text","value":"abc"},"is_set":true}"#)
                .unwrap();
        assert_eq!(item.sql_type, SqlType::Varchar);
        assert_eq!(item.value.as_text(), Some("abc"));
        assert!(!item.is_output);
        assert!(item.formal_name.is_none());
    }
}
