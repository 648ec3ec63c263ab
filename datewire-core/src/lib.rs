//! datewire core - Fundamental types
//!
//! This crate provides the core types used throughout datewire:
//! - `CivilDate`, `CivilTime`, `CivilDateTime`: proleptic Gregorian calendar values
//! - `PackedDateTime`: the server's packed datetime with lazy calendar views
//! - `Temporal`: a calendar value in its natural shape
//! - `DriverError`: structured errors carrying a SQLSTATE code

mod calendar;
mod packed;
mod value;
mod error;

pub use calendar::{
    days_in_month, is_leap_year, CalendarError, CivilDate, CivilDateTime, CivilTime, Era,
    MAX_YEAR, MIN_YEAR,
};
pub use packed::{
    pack_date, pack_time, unpack_date, unpack_time, PackError, Packed, PackedDateTime, PackedTime,
    ABSENT, MAX_PACK_YEAR, MAX_TICKS, MIN_PACK_YEAR, PACKED_EPOCH, TICKS_PER_HOUR,
    TICKS_PER_MINUTE, TICKS_PER_SECOND,
};
pub use value::Temporal;
pub use error::{DriverError, ErrorContext, codes};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CivilDate, CivilDateTime, CivilTime, DriverError, Packed, PackedDateTime, Temporal,
    };
    pub use crate::error::codes;
}
