//! Natural temporal values
//!
//! A `Temporal` is whichever calendar shape a packed value naturally maps
//! to: a time of day when the date is absent, a date when the time is
//! absent, otherwise a full timestamp.

use crate::{CalendarError, CivilDate, CivilDateTime, CivilTime, Era};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar value in one of its three shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Temporal {
    Timestamp(CivilDateTime),
    Date(CivilDate),
    Time(CivilTime),
}

impl Temporal {
    /// Era of the value; a bare time of day sits on the common-era anchor day
    pub fn era(&self) -> Era {
        match self {
            Temporal::Timestamp(ts) => ts.era(),
            Temporal::Date(d) => d.era(),
            Temporal::Time(_) => Era::Common,
        }
    }

    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Temporal::Timestamp(_) => "Timestamp",
            Temporal::Date(_) => "Date",
            Temporal::Time(_) => "Time",
        }
    }

    /// Widen to a timestamp: dates gain midnight, times gain the 1970-01-01 anchor
    pub fn to_timestamp(&self) -> CivilDateTime {
        match self {
            Temporal::Timestamp(ts) => *ts,
            Temporal::Date(d) => d.at_midnight(),
            Temporal::Time(t) => t.anchored(),
        }
    }

    /// Parse whichever shape the text has
    ///
    /// Supported formats:
    /// - 2025-06-15
    /// - 14:30[:00[.250]]
    /// - 2025-06-15 14:30:00.250 (or with a `T` separator)
    pub fn parse(s: &str) -> Result<Self, CalendarError> {
        let s = s.trim();
        if s.contains('T') || s.contains(' ') {
            return s.parse().map(Temporal::Timestamp);
        }
        if s.contains(':') {
            return s.parse().map(Temporal::Time);
        }
        s.parse().map(Temporal::Date)
    }
}

impl From<CivilDateTime> for Temporal {
    fn from(ts: CivilDateTime) -> Self {
        Temporal::Timestamp(ts)
    }
}

impl From<CivilDate> for Temporal {
    fn from(d: CivilDate) -> Self {
        Temporal::Date(d)
    }
}

impl From<CivilTime> for Temporal {
    fn from(t: CivilTime) -> Self {
        Temporal::Time(t)
    }
}

impl fmt::Display for Temporal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Temporal::Timestamp(ts) => write!(f, "{}", ts),
            Temporal::Date(d) => write!(f, "{}", d),
            Temporal::Time(t) => write!(f, "{}", t),
        }
    }
}
