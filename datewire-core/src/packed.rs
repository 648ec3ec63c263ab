//! Packed server datetime codec
//!
//! The server transmits a datetime as two 32-bit integers: days since
//! 1900-01-01 and ticks of 1/300 second since midnight. The narrow
//! `smalldatetime` form carries a 16-bit day count and a 16-bit minute
//! count instead. Either component may be absent on the wire, signalled by
//! `i32::MIN`; inside this crate absence is carried by the `Packed` tag and
//! the sentinel only appears at the wire boundary.
//!
//! Date packing uses the Fliegel & van Flandern integer Julian-day
//! algorithm (Communications of the ACM, Vol 11, No 10, October 1968)
//! shifted to the 1900-01-01 epoch. All divisions truncate and the
//! evaluation order is significant.

use crate::{CivilDate, CivilDateTime, CivilTime, Era, Temporal};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

// ============================================================================
// Constants
// ============================================================================

/// Wire sentinel for an absent date or time component
pub const ABSENT: i32 = i32::MIN;

pub const TICKS_PER_SECOND: i32 = 300;
pub const TICKS_PER_MINUTE: i32 = 60 * TICKS_PER_SECOND;
pub const TICKS_PER_HOUR: i32 = 60 * TICKS_PER_MINUTE;
/// Largest tick count before 24:00:00
pub const MAX_TICKS: i32 = 24 * TICKS_PER_HOUR - 1;

/// Smallest year the server datetime type can hold
pub const MIN_PACK_YEAR: i32 = 1753;
/// Largest year the server datetime type can hold
pub const MAX_PACK_YEAR: i32 = 9999;

/// Day 0 of the packed date
pub const PACKED_EPOCH: CivilDate = CivilDate::from_parts_unchecked(1900, 1, 1);

/// Julian day number of 1900-01-01
const JULIAN_DAY_OF_EPOCH: i32 = 2_415_021;

// ============================================================================
// PackError
// ============================================================================

/// Errors raised while packing a calendar value for the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PackError {
    #[error("Year {year} is not in the AD era")]
    EraRange { year: i32 },

    #[error("Year {year} is outside the supported range 1753-9999")]
    YearRange { year: i32 },

    #[error("Present {field} component holds the absence sentinel")]
    AbsentField { field: &'static str },

    #[error("Packed value has neither a date nor a time")]
    NothingPresent,
}

// ============================================================================
// Date and time arithmetic
// ============================================================================

/// Pack a calendar date into days since 1900-01-01
pub fn pack_date(date: &CivilDate) -> Result<i32, PackError> {
    let year = date.year();
    if !(MIN_PACK_YEAR..=MAX_PACK_YEAR).contains(&year) {
        return Err(PackError::YearRange { year });
    }
    let month = date.month() as i32;
    let day = date.day() as i32;

    Ok(day - 32075
        + 1461 * (year + 4800 + (month - 14) / 12) / 4
        + 367 * (month - 2 - (month - 14) / 12 * 12) / 12
        - 3 * ((year + 4900 + (month - 14) / 12) / 100) / 4
        - JULIAN_DAY_OF_EPOCH)
}

/// Unpack days since 1900-01-01 into a calendar date
pub fn unpack_date(days: i32) -> CivilDate {
    // 1900-01-01 is what the server sends for datetimes carrying only a time
    if days == 0 {
        return PACKED_EPOCH;
    }
    unpack_julian(days)
}

/// Inverse Fliegel & van Flandern formula
///
/// Wider integers keep out-of-contract day counts from overflowing; for
/// any server date the result is identical to 32-bit evaluation.
fn unpack_julian(days: i32) -> CivilDate {
    let mut l = days as i64 + 68_569 + JULIAN_DAY_OF_EPOCH as i64;
    let n = 4 * l / 146_097;
    l -= (146_097 * n + 3) / 4;
    let mut i = 4000 * (l + 1) / 1_461_001;
    l = l - 1461 * i / 4 + 31;
    let mut j = 80 * l / 2447;
    let k = l - 2447 * j / 80;
    l = j / 11;
    j = j + 2 - 12 * l;
    i = 100 * (n - 49) + i + l;
    CivilDate::from_parts_unchecked(i as i32, j as u8, k as u8)
}

/// Result of packing a time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedTime {
    /// Ticks since midnight
    pub ticks: i32,
    /// The time rounded up to 24:00:00 and was reset to midnight; the
    /// caller owes the date one extra day
    pub carry: bool,
}

/// Pack a time of day into 1/300 second ticks
///
/// Milliseconds round half-up to the nearest tick. Rounding can push
/// 23:59:59.998+ past the last tick of the day; the server cannot hold
/// 24:00:00, so the result wraps to midnight with `carry` set.
pub fn pack_time(time: &CivilTime) -> PackedTime {
    let ticks = time.hour() as i32 * TICKS_PER_HOUR
        + time.minute() as i32 * TICKS_PER_MINUTE
        + time.second() as i32 * TICKS_PER_SECOND
        + (time.millisecond() as i32 * TICKS_PER_SECOND + 500) / 1000;

    if ticks > MAX_TICKS {
        PackedTime { ticks: 0, carry: true }
    } else {
        PackedTime { ticks, carry: false }
    }
}

/// Unpack 1/300 second ticks into a time of day
pub fn unpack_time(ticks: i32) -> CivilTime {
    let hours = ticks / TICKS_PER_HOUR;
    let mut rem = ticks - hours * TICKS_PER_HOUR;
    let minutes = rem / TICKS_PER_MINUTE;
    rem -= minutes * TICKS_PER_MINUTE;
    let seconds = rem / TICKS_PER_SECOND;
    rem -= seconds * TICKS_PER_SECOND;
    let millis = (rem * 1000 + TICKS_PER_SECOND / 2) / TICKS_PER_SECOND;
    CivilTime::from_parts_unchecked(hours as u8, minutes as u8, seconds as u8, millis as u16)
}

// ============================================================================
// Packed
// ============================================================================

/// The packed wire pair with absence made explicit
///
/// A present component never holds `ABSENT`. Deserialization rejects it;
/// `PackedDateTime::from_packed` normalizes hand-built values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[serde(try_from = "TaggedPair")]
pub enum Packed {
    Full { date: i32, time: i32 },
    DateOnly { date: i32 },
    TimeOnly { time: i32 },
}

impl Packed {
    /// Read a wide pair, treating `ABSENT` as a missing component
    ///
    /// Returns `None` when both components are absent.
    pub fn from_wire(date: i32, time: i32) -> Option<Self> {
        match (date, time) {
            (ABSENT, ABSENT) => None,
            (ABSENT, time) => Some(Packed::TimeOnly { time }),
            (date, ABSENT) => Some(Packed::DateOnly { date }),
            (date, time) => Some(Packed::Full { date, time }),
        }
    }

    /// Write as a wide pair, `ABSENT` standing in for a missing component
    pub fn to_wire(&self) -> (i32, i32) {
        (self.date().unwrap_or(ABSENT), self.time().unwrap_or(ABSENT))
    }

    /// Re-read through the wire form, demoting components that hold `ABSENT`
    pub fn normalized(self) -> Option<Self> {
        let (date, time) = self.to_wire();
        Self::from_wire(date, time)
    }

    pub fn date(&self) -> Option<i32> {
        match *self {
            Packed::Full { date, .. } | Packed::DateOnly { date } => Some(date),
            Packed::TimeOnly { .. } => None,
        }
    }

    pub fn time(&self) -> Option<i32> {
        match *self {
            Packed::Full { time, .. } | Packed::TimeOnly { time } => Some(time),
            Packed::DateOnly { .. } => None,
        }
    }
}

/// Serialized shape of `Packed`, checked before it becomes one
#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum TaggedPair {
    Full { date: i32, time: i32 },
    DateOnly { date: i32 },
    TimeOnly { time: i32 },
}

impl TryFrom<TaggedPair> for Packed {
    type Error = PackError;

    fn try_from(pair: TaggedPair) -> Result<Self, Self::Error> {
        let present = |field: &'static str, value: i32| {
            if value == ABSENT {
                Err(PackError::AbsentField { field })
            } else {
                Ok(value)
            }
        };
        Ok(match pair {
            TaggedPair::Full { date, time } => Packed::Full {
                date: present("date", date)?,
                time: present("time", time)?,
            },
            TaggedPair::DateOnly { date } => Packed::DateOnly { date: present("date", date)? },
            TaggedPair::TimeOnly { time } => Packed::TimeOnly { time: present("time", time)? },
        })
    }
}

// ============================================================================
// PackedDateTime
// ============================================================================

/// Unpacked calendar fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fields {
    date: CivilDate,
    time: CivilTime,
}

/// A server datetime value with lazily materialized calendar views
///
/// Built either from wire integers (no validation; the decoder trusts the
/// server) or from a calendar value (validated, packed eagerly). Calendar
/// fields and each output view are computed at most once. The caches make
/// the type `!Sync`: share it across threads only after cloning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Packed", into = "Packed")]
pub struct PackedDateTime {
    packed: Packed,
    fields: OnceCell<Fields>,
    timestamp: OnceCell<CivilDateTime>,
    date_value: OnceCell<CivilDate>,
    time_value: OnceCell<CivilTime>,
    string_value: OnceCell<String>,
}

impl PackedDateTime {
    // ========== Construction from the wire ==========

    /// Wide pair where either component may be `ABSENT`
    ///
    /// Returns `None` when both components are absent.
    pub fn new(date: i32, time: i32) -> Option<Self> {
        Packed::from_wire(date, time).map(Self::from_tag)
    }

    /// Narrow `smalldatetime` pair: days since 1900-01-01 and minutes since midnight
    pub fn from_small(days: u16, minutes: u16) -> Self {
        Self::from_tag(Packed::Full {
            date: i32::from(days),
            time: i32::from(minutes) * TICKS_PER_MINUTE,
        })
    }

    /// Accept a tag, treating any component holding `ABSENT` as missing
    pub fn from_packed(packed: Packed) -> Option<Self> {
        packed.normalized().map(Self::from_tag)
    }

    fn from_tag(packed: Packed) -> Self {
        Self {
            packed,
            fields: OnceCell::new(),
            timestamp: OnceCell::new(),
            date_value: OnceCell::new(),
            time_value: OnceCell::new(),
            string_value: OnceCell::new(),
        }
    }

    fn with_fields(packed: Packed, fields: Fields) -> Self {
        let mut value = Self::from_tag(packed);
        value.fields = OnceCell::from(fields);
        value
    }

    // ========== Construction from calendar values ==========

    /// Pack a full timestamp
    pub fn from_timestamp(ts: &CivilDateTime) -> Result<Self, PackError> {
        check_era(ts.era(), ts.date().year())?;

        let mut date = ts.date();
        let mut days = pack_date(&date)?;
        let packed_time = pack_time(&ts.time());
        let time = if packed_time.carry {
            date = date.succ().map_err(|_| PackError::YearRange { year: date.year() })?;
            days += 1;
            debug!(%ts, carried_to = %date, "time rounded past 23:59:59, carried into next day");
            CivilTime::MIDNIGHT
        } else {
            ts.time()
        };

        Ok(Self::with_fields(
            Packed::Full { date: days, time: packed_time.ticks },
            Fields { date, time },
        ))
    }

    /// Pack a date; the time component is absent
    pub fn from_date(date: &CivilDate) -> Result<Self, PackError> {
        check_era(date.era(), date.year())?;
        let days = pack_date(date)?;
        Ok(Self::with_fields(
            Packed::DateOnly { date: days },
            Fields { date: *date, time: CivilTime::MIDNIGHT },
        ))
    }

    /// Pack a time of day; the date component is absent
    ///
    /// A time that rounds up to 24:00:00 becomes midnight with no day to
    /// carry into. The visible date is the 1970-01-01 anchor.
    pub fn from_time(time: &CivilTime) -> Self {
        let packed_time = pack_time(time);
        let time = if packed_time.carry {
            debug!(%time, "time-only value rounded past 23:59:59, reset to midnight");
            CivilTime::MIDNIGHT
        } else {
            *time
        };
        Self::with_fields(
            Packed::TimeOnly { time: packed_time.ticks },
            Fields { date: CivilDate::UNIX_EPOCH, time },
        )
    }

    /// Pack the time of day of a full host value, discarding its date
    pub fn from_time_of(ts: &CivilDateTime) -> Result<Self, PackError> {
        check_era(ts.era(), ts.date().year())?;
        Ok(Self::from_time(&ts.time()))
    }

    /// Pack whichever shape the value has
    pub fn from_temporal(value: &Temporal) -> Result<Self, PackError> {
        match value {
            Temporal::Timestamp(ts) => Self::from_timestamp(ts),
            Temporal::Date(d) => Self::from_date(d),
            Temporal::Time(t) => Ok(Self::from_time(t)),
        }
    }

    // ========== Wire accessors ==========

    pub fn packed(&self) -> Packed {
        self.packed
    }

    /// Packed day count, or 0 when the date is absent
    pub fn date(&self) -> i32 {
        self.packed.date().unwrap_or(0)
    }

    /// Packed tick count, or 0 when the time is absent
    pub fn time(&self) -> i32 {
        self.packed.time().unwrap_or(0)
    }

    pub fn is_date_absent(&self) -> bool {
        matches!(self.packed, Packed::TimeOnly { .. })
    }

    pub fn is_time_absent(&self) -> bool {
        matches!(self.packed, Packed::DateOnly { .. })
    }

    // ========== Calendar views ==========

    fn fields(&self) -> &Fields {
        self.fields.get_or_init(|| unpack(&self.packed))
    }

    /// Date and time as one value; an absent date reads as 1970-01-01,
    /// an absent time as midnight
    pub fn to_timestamp(&self) -> CivilDateTime {
        *self.timestamp.get_or_init(|| {
            trace!(packed = ?self.packed, "materializing timestamp view");
            let fields = self.fields();
            CivilDateTime::new(fields.date, fields.time)
        })
    }

    pub fn to_date(&self) -> CivilDate {
        *self.date_value.get_or_init(|| {
            trace!(packed = ?self.packed, "materializing date view");
            self.fields().date
        })
    }

    /// Time of day; see `CivilTime::anchored` for the 1970-01-01 form
    pub fn to_time(&self) -> CivilTime {
        *self.time_value.get_or_init(|| {
            trace!(packed = ?self.packed, "materializing time view");
            self.fields().time
        })
    }

    /// The shape the value naturally has
    pub fn to_natural(&self) -> Temporal {
        match self.packed {
            Packed::TimeOnly { .. } => Temporal::Time(self.to_time()),
            Packed::DateOnly { .. } => Temporal::Date(self.to_date()),
            Packed::Full { .. } => Temporal::Timestamp(self.to_timestamp()),
        }
    }

    /// `YYYY-MM-DD HH:MM:SS.fff`, with absent segments left out and up to
    /// two trailing zeros dropped from the fraction
    pub fn to_canonical_string(&self) -> &str {
        self.string_value.get_or_init(|| {
            trace!(packed = ?self.packed, "materializing canonical string");
            format_canonical(&self.packed, self.fields())
        })
    }
}

fn check_era(era: Era, year: i32) -> Result<(), PackError> {
    if era == Era::Common {
        Ok(())
    } else {
        Err(PackError::EraRange { year })
    }
}

fn unpack(packed: &Packed) -> Fields {
    trace!(?packed, "unpacking server datetime");
    let date = match packed.date() {
        Some(days) => unpack_date(days),
        None => CivilDate::UNIX_EPOCH,
    };
    let time = match packed.time() {
        Some(ticks) => unpack_time(ticks),
        None => CivilTime::MIDNIGHT,
    };
    Fields { date, time }
}

/// Write `width` decimal digits of `value` ending just before `end`
fn put_digits(buf: &mut [u8], end: usize, mut value: u32, width: usize) {
    for pos in (end - width..end).rev() {
        buf[pos] = b'0' + (value % 10) as u8;
        value /= 10;
    }
}

fn format_canonical(packed: &Packed, fields: &Fields) -> String {
    let mut buf = [0u8; 23];
    let mut p = 0;

    if packed.date().is_some() {
        let date = &fields.date;
        put_digits(&mut buf, 4, date.year().unsigned_abs(), 4);
        buf[4] = b'-';
        put_digits(&mut buf, 7, date.month() as u32, 2);
        buf[7] = b'-';
        put_digits(&mut buf, 10, date.day() as u32, 2);
        p = 10;
        if packed.time().is_some() {
            buf[p] = b' ';
            p += 1;
        }
    }

    if packed.time().is_some() {
        let time = &fields.time;
        put_digits(&mut buf, p + 2, time.hour() as u32, 2);
        buf[p + 2] = b':';
        put_digits(&mut buf, p + 5, time.minute() as u32, 2);
        buf[p + 5] = b':';
        put_digits(&mut buf, p + 8, time.second() as u32, 2);
        buf[p + 8] = b'.';
        put_digits(&mut buf, p + 12, time.millisecond() as u32, 3);
        p += 12;
        // At most two zeros go; "x.0" keeps its last digit
        if buf[p - 1] == b'0' {
            p -= 1;
        }
        if buf[p - 1] == b'0' {
            p -= 1;
        }
    }

    buf[..p].iter().map(|&b| char::from(b)).collect()
}

impl fmt::Display for PackedDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_canonical_string())
    }
}

impl PartialEq for PackedDateTime {
    fn eq(&self, other: &Self) -> bool {
        self.packed == other.packed
    }
}

impl Eq for PackedDateTime {}

impl std::hash::Hash for PackedDateTime {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.packed.hash(state);
    }
}

impl TryFrom<Packed> for PackedDateTime {
    type Error = PackError;

    fn try_from(packed: Packed) -> Result<Self, Self::Error> {
        Self::from_packed(packed).ok_or(PackError::NothingPresent)
    }
}

impl From<PackedDateTime> for Packed {
    fn from(value: PackedDateTime) -> Self {
        value.packed
    }
}

// ============================================================================
// Tests
// ============================================================================
