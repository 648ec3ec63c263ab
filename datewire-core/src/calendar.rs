//! Calendar values for datewire
//!
//! Timezone-naive civil date and time types on the proleptic Gregorian
//! calendar. These are the values client code hands to the codec and the
//! values the codec hands back.
//!
//! Design principles:
//! - No host calendar or timezone database (behaviour never depends on the
//!   environment)
//! - Astronomical year numbering: year 0 is 1 BC, year -1 is 2 BC
//! - Millisecond precision, matching what the wire format can carry
//! - Never panics - construction and arithmetic return Results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

pub const MILLIS_PER_SECOND: i64 = 1_000;
pub const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
pub const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
pub const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// Smallest year a calendar value may carry
pub const MIN_YEAR: i32 = -999_999;
/// Largest year a calendar value may carry
pub const MAX_YEAR: i32 = 999_999;

/// Days in each month (non-leap year)
const DAYS_IN_MONTH: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Unix epoch: 1970-01-01
const UNIX_EPOCH_DAYS: i64 = 719_468; // Days from year 0 to 1970-01-01

// ============================================================================
// CalendarError
// ============================================================================

/// Errors raised while building or shifting calendar values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("Invalid month: {0} (must be 1-12)")]
    InvalidMonth(u8),

    #[error("Invalid day: {day} for {year}-{month:02}")]
    InvalidDay { year: i32, month: u8, day: u8 },

    #[error("Invalid hour: {0} (must be 0-23)")]
    InvalidHour(u8),

    #[error("Invalid minute: {0} (must be 0-59)")]
    InvalidMinute(u8),

    #[error("Invalid second: {0} (must be 0-59)")]
    InvalidSecond(u8),

    #[error("Invalid millisecond: {0} (must be 0-999)")]
    InvalidMillisecond(u16),

    #[error("Year {0} is outside the calendar span")]
    YearOutOfRange(i64),

    #[error("Parse error: {0}")]
    Parse(String),
}

// ============================================================================
// Era
// ============================================================================

/// Calendar era of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Era {
    /// Before the common era (BC): astronomical year 0 and below
    BeforeCommon,
    /// Common era (AD): year 1 and above
    Common,
}

impl Era {
    /// Era of an astronomical year number
    pub fn of_year(year: i32) -> Self {
        if year >= 1 { Era::Common } else { Era::BeforeCommon }
    }
}

// ============================================================================
// CivilDate
// ============================================================================

/// A calendar date without time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CivilDate {
    year: i32,
    month: u8,
    day: u8,
}

impl CivilDate {
    /// 1970-01-01
    pub const UNIX_EPOCH: CivilDate = CivilDate { year: 1970, month: 1, day: 1 };

    // ========== Construction ==========

    /// Create a validated date
    pub fn new(year: i32, month: u8, day: u8) -> Result<Self, CalendarError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(CalendarError::YearOutOfRange(year as i64));
        }
        if !(1..=12).contains(&month) {
            return Err(CalendarError::InvalidMonth(month));
        }
        if day < 1 || day > days_in_month(year, month) {
            return Err(CalendarError::InvalidDay { year, month, day });
        }
        Ok(Self { year, month, day })
    }

    /// Build a date from fields already known to be consistent
    pub(crate) const fn from_parts_unchecked(year: i32, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// Create a date from a day count relative to 1970-01-01
    pub fn from_unix_days(days: i64) -> Result<Self, CalendarError> {
        let (year, month, day) = civil_from_days(days);
        if year < MIN_YEAR as i64 || year > MAX_YEAR as i64 {
            return Err(CalendarError::YearOutOfRange(year));
        }
        Ok(Self { year: year as i32, month, day })
    }

    // ========== Accessors ==========

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Month (1-12)
    pub fn month(&self) -> u8 {
        self.month
    }

    /// Day of month (1-31)
    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn era(&self) -> Era {
        Era::of_year(self.year)
    }

    /// Days since 1970-01-01 (negative before)
    pub fn to_unix_days(&self) -> i64 {
        days_from_civil(self.year, self.month, self.day)
    }

    /// Day of week (1=Monday, 7=Sunday, ISO 8601)
    pub fn weekday(&self) -> u8 {
        // 1970-01-01 was Thursday (4)
        let day_of_week = (self.to_unix_days() + 3).rem_euclid(7);
        (day_of_week + 1) as u8
    }

    /// Day of year (1-366)
    pub fn day_of_year(&self) -> u16 {
        let mut doy = self.day as u16;
        for m in 1..self.month {
            doy += days_in_month(self.year, m) as u16;
        }
        doy
    }

    // ========== Arithmetic ==========

    /// Shift by a signed number of days
    pub fn checked_add_days(&self, days: i64) -> Result<Self, CalendarError> {
        let shifted = self
            .to_unix_days()
            .checked_add(days)
            .ok_or(CalendarError::YearOutOfRange(self.year as i64))?;
        Self::from_unix_days(shifted)
    }

    /// The following calendar day
    pub fn succ(&self) -> Result<Self, CalendarError> {
        self.checked_add_days(1)
    }

    /// This date at 00:00:00.000
    pub fn at_midnight(&self) -> CivilDateTime {
        CivilDateTime::new(*self, CivilTime::MIDNIGHT)
    }
}

impl fmt::Display for CivilDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl From<CivilDate> for String {
    fn from(date: CivilDate) -> Self {
        date.to_string()
    }
}

impl TryFrom<String> for CivilDate {
    type Error = CalendarError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ============================================================================
// CivilTime
// ============================================================================

/// A time of day with millisecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CivilTime {
    hour: u8,
    minute: u8,
    second: u8,
    millisecond: u16,
}

impl CivilTime {
    /// 00:00:00.000
    pub const MIDNIGHT: CivilTime = CivilTime { hour: 0, minute: 0, second: 0, millisecond: 0 };

    /// Create a validated time of day
    pub fn new(hour: u8, minute: u8, second: u8, millisecond: u16) -> Result<Self, CalendarError> {
        if hour > 23 {
            return Err(CalendarError::InvalidHour(hour));
        }
        if minute > 59 {
            return Err(CalendarError::InvalidMinute(minute));
        }
        if second > 59 {
            return Err(CalendarError::InvalidSecond(second));
        }
        if millisecond > 999 {
            return Err(CalendarError::InvalidMillisecond(millisecond));
        }
        Ok(Self { hour, minute, second, millisecond })
    }

    pub(crate) const fn from_parts_unchecked(
        hour: u8,
        minute: u8,
        second: u8,
        millisecond: u16,
    ) -> Self {
        Self { hour, minute, second, millisecond }
    }

    /// Create from milliseconds since midnight
    pub fn from_millis_of_day(millis: u32) -> Result<Self, CalendarError> {
        let millis = millis as i64;
        if millis >= MILLIS_PER_DAY {
            let hour = (millis / MILLIS_PER_HOUR).min(u8::MAX as i64) as u8;
            return Err(CalendarError::InvalidHour(hour));
        }
        Ok(Self {
            hour: (millis / MILLIS_PER_HOUR) as u8,
            minute: ((millis % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE) as u8,
            second: ((millis % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND) as u8,
            millisecond: (millis % MILLIS_PER_SECOND) as u16,
        })
    }

    /// Hour (0-23)
    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// Minute (0-59)
    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Second (0-59)
    pub fn second(&self) -> u8 {
        self.second
    }

    /// Millisecond (0-999)
    pub fn millisecond(&self) -> u16 {
        self.millisecond
    }

    /// Milliseconds since midnight
    pub fn millis_of_day(&self) -> u32 {
        self.hour as u32 * MILLIS_PER_HOUR as u32
            + self.minute as u32 * MILLIS_PER_MINUTE as u32
            + self.second as u32 * MILLIS_PER_SECOND as u32
            + self.millisecond as u32
    }

    /// This time of day on 1970-01-01, the anchor day of time-only values
    pub fn anchored(&self) -> CivilDateTime {
        CivilDateTime::new(CivilDate::UNIX_EPOCH, *self)
    }
}

impl fmt::Display for CivilTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            self.hour, self.minute, self.second, self.millisecond
        )
    }
}

impl From<CivilTime> for String {
    fn from(time: CivilTime) -> Self {
        time.to_string()
    }
}

impl TryFrom<String> for CivilTime {
    type Error = CalendarError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ============================================================================
// CivilDateTime
// ============================================================================

/// A calendar date with a time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CivilDateTime {
    date: CivilDate,
    time: CivilTime,
}

impl CivilDateTime {
    pub const fn new(date: CivilDate, time: CivilTime) -> Self {
        Self { date, time }
    }

    /// Create from components
    pub fn from_ymd_hms_milli(
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        millisecond: u16,
    ) -> Result<Self, CalendarError> {
        Ok(Self {
            date: CivilDate::new(year, month, day)?,
            time: CivilTime::new(hour, minute, second, millisecond)?,
        })
    }

    /// Interpret milliseconds since 1970-01-01T00:00:00 as a civil value
    ///
    /// No timezone is applied: the instant is read as UTC wall-clock time.
    pub fn from_unix_millis(millis: i64) -> Result<Self, CalendarError> {
        let days = millis.div_euclid(MILLIS_PER_DAY);
        let millis_of_day = millis.rem_euclid(MILLIS_PER_DAY) as u32;
        Ok(Self {
            date: CivilDate::from_unix_days(days)?,
            time: CivilTime::from_millis_of_day(millis_of_day)?,
        })
    }

    /// Milliseconds since 1970-01-01T00:00:00 (negative before)
    pub fn to_unix_millis(&self) -> i64 {
        self.date.to_unix_days() * MILLIS_PER_DAY + self.time.millis_of_day() as i64
    }

    pub fn date(&self) -> CivilDate {
        self.date
    }

    pub fn time(&self) -> CivilTime {
        self.time
    }

    pub fn era(&self) -> Era {
        self.date.era()
    }
}

impl fmt::Display for CivilDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.time)
    }
}

impl From<CivilDateTime> for String {
    fn from(dt: CivilDateTime) -> Self {
        dt.to_string()
    }
}

impl TryFrom<String> for CivilDateTime {
    type Error = CalendarError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ============================================================================
// Calendar Utilities (Gregorian proleptic)
// ============================================================================

/// Check if year is a leap year
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Get days in a month
pub fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        2 if is_leap_year(year) => 29,
        m @ 1..=12 => DAYS_IN_MONTH[(m - 1) as usize],
        _ => 0,
    }
}

/// Convert civil date to days since Unix epoch
/// Algorithm from Howard Hinnant: http://howardhinnant.github.io/date_algorithms.html
fn days_from_civil(year: i32, month: u8, day: u8) -> i64 {
    let y = if month <= 2 { year as i64 - 1 } else { year as i64 };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = y - era * 400; // [0, 399]
    let m = month as i64;
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + day as i64 - 1; // [0, 365]
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy; // [0, 146096]
    era * 146097 + doe - UNIX_EPOCH_DAYS
}

/// Convert days since Unix epoch to civil date
/// Algorithm from Howard Hinnant: http://howardhinnant.github.io/date_algorithms.html
fn civil_from_days(days: i64) -> (i64, u8, u8) {
    let z = days.saturating_add(UNIX_EPOCH_DAYS);
    let era = (if z >= 0 { z } else { z - 146096 }) / 146097;
    let doe = z - era * 146097; // [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365; // [0, 399]
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // [0, 11]
    let d = doy - (153 * mp + 2) / 5 + 1; // [1, 31]
    let m = if mp < 10 { mp + 3 } else { mp - 9 }; // [1, 12]
    let year = if m <= 2 { y + 1 } else { y };
    (year, m as u8, d as u8)
}

// ============================================================================
// Parsing
// ============================================================================

impl FromStr for CivilDate {
    type Err = CalendarError;

    /// Parse `YYYY-MM-DD` (a leading `-` marks a non-positive year)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let parts: Vec<&str> = body.split('-').collect();
        if parts.len() != 3 {
            return Err(CalendarError::Parse("Expected YYYY-MM-DD".to_string()));
        }

        let year: i32 = parts[0].parse()
            .map_err(|_| CalendarError::Parse("Invalid year".to_string()))?;
        let month: u8 = parts[1].parse()
            .map_err(|_| CalendarError::Parse("Invalid month".to_string()))?;
        let day: u8 = parts[2].parse()
            .map_err(|_| CalendarError::Parse("Invalid day".to_string()))?;

        Self::new(if negative { -year } else { year }, month, day)
    }
}

impl FromStr for CivilTime {
    type Err = CalendarError;

    /// Parse `HH:MM[:SS[.fff]]`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (time_no_frac, millis) = match s.find('.') {
            Some(dot_pos) => (&s[..dot_pos], parse_fractional_millis(&s[dot_pos + 1..])?),
            None => (s, 0u16),
        };

        let parts: Vec<&str> = time_no_frac.split(':').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(CalendarError::Parse("Expected HH:MM[:SS]".to_string()));
        }

        let hour: u8 = parts[0].parse()
            .map_err(|_| CalendarError::Parse("Invalid hour".to_string()))?;
        let minute: u8 = parts[1].parse()
            .map_err(|_| CalendarError::Parse("Invalid minute".to_string()))?;
        let second: u8 = match parts.get(2) {
            Some(p) => p.parse()
                .map_err(|_| CalendarError::Parse("Invalid second".to_string()))?,
            None => 0,
        };

        Self::new(hour, minute, second, millis)
    }
}

impl FromStr for CivilDateTime {
    type Err = CalendarError;

    /// Parse `YYYY-MM-DD[T| ]HH:MM[:SS[.fff]]`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s.find('T').or_else(|| s.find(' '));
        match split {
            Some(pos) => Ok(Self {
                date: s[..pos].parse()?,
                time: s[pos + 1..].parse()?,
            }),
            None => Err(CalendarError::Parse(format!("Unrecognized format: {}", s))),
        }
    }
}

/// Pad or truncate a fraction of a second to 3 digits (milliseconds)
fn parse_fractional_millis(s: &str) -> Result<u16, CalendarError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CalendarError::Parse("Invalid fractional seconds".to_string()));
    }
    let padded = if s.len() >= 3 {
        s[..3].to_string()
    } else {
        format!("{:0<3}", s)
    };
    padded.parse()
        .map_err(|_| CalendarError::Parse("Invalid fractional seconds".to_string()))
}

// ============================================================================
// Tests
// ============================================================================
