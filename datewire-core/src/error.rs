//! Structured driver errors
//!
//! Every typed error in the workspace converts into a `DriverError`: a
//! serializable value carrying a SQLSTATE code, a message, and enough
//! context for a caller to report which value or parameter was at fault.

use crate::{CalendarError, PackError};
use serde::{Deserialize, Serialize};

/// SQLSTATE codes (machine-readable)
pub mod codes {
    /// Invalid datetime format (also used for values outside the common era)
    pub const INVALID_DATETIME_FORMAT: &str = "22007";
    /// Numeric value out of range
    pub const NUMERIC_OUT_OF_RANGE: &str = "22003";
    /// Datetime field overflow
    pub const DATETIME_FIELD_OVERFLOW: &str = "22008";
    /// Wrong number of parameters / parameter not bound
    pub const PARAMETER_NOT_SET: &str = "07001";
    /// Invalid SQL data type
    pub const INVALID_DATA_TYPE: &str = "HY004";
    /// Optional feature not implemented
    pub const NOT_IMPLEMENTED: &str = "HYC00";
    /// Protocol violation on the inspector's request stream
    pub const PROTOCOL_VIOLATION: &str = "08P01";
    /// General error
    pub const GENERAL: &str = "HY000";
}

/// Context about where an error occurred
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// 1-based index of the parameter at fault
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<usize>,

    /// Offending value, rendered as text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Propagation notes
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

/// Structured error reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverError {
    /// SQLSTATE code
    pub sql_state: String,

    /// Human-readable error message
    pub message: String,

    /// Suggestion for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// Where the error occurred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
}

impl DriverError {
    /// Create a new error
    pub fn new(sql_state: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sql_state: sql_state.into(),
            message: message.into(),
            suggestion: None,
            context: None,
        }
    }

    /// Builder: add suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Builder: set parameter index
    pub fn for_parameter(mut self, index: usize) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.parameter = Some(index);
        self
    }

    /// Builder: set offending value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.value = Some(value.into());
        self
    }

    /// Builder: add propagation note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.notes.push(note.into());
        self
    }

    // ========== Common Error Constructors ==========

    pub fn invalid_datetime(details: impl Into<String>) -> Self {
        Self::new(codes::INVALID_DATETIME_FORMAT, format!("Invalid datetime: {}", details.into()))
            .with_suggestion("Use YYYY-MM-DD, HH:MM[:SS[.fff]] or YYYY-MM-DD HH:MM[:SS[.fff]]")
    }

    pub fn era_range(year: i32) -> Self {
        Self::new(
            codes::INVALID_DATETIME_FORMAT,
            "Only dates in the AD era can be transmitted to the server",
        )
        .with_value(year.to_string())
    }

    pub fn year_range(year: i32) -> Self {
        Self::new(
            codes::NUMERIC_OUT_OF_RANGE,
            "Date is outside the server datetime range 1753-01-01 to 9999-12-31",
        )
        .with_value(year.to_string())
        .with_suggestion("Use a year between 1753 and 9999")
    }
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.sql_state, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (suggestion: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for DriverError {}

impl From<PackError> for DriverError {
    fn from(err: PackError) -> Self {
        match err {
            PackError::EraRange { year } => Self::era_range(year),
            PackError::YearRange { year } => Self::year_range(year),
            PackError::AbsentField { .. } | PackError::NothingPresent => {
                Self::new(codes::INVALID_DATETIME_FORMAT, err.to_string())
            }
        }
    }
}

impl From<CalendarError> for DriverError {
    fn from(err: CalendarError) -> Self {
        match err {
            CalendarError::YearOutOfRange(y) => {
                Self::new(codes::DATETIME_FIELD_OVERFLOW, err.to_string()).with_value(y.to_string())
            }
            other => Self::invalid_datetime(other.to_string()),
        }
    }
}
