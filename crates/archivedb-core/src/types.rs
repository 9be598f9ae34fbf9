//! Field-level helper types shared by generated entities.
//!
//! [`Timestamp`] is the in-memory representation of `timestamp`/`timestamptz`
//! columns. [`IsZero`] decides whether a defaulted column carries a value the
//! caller set explicitly, and [`Stamp`] implements the automatic
//! `created_at`/`updated_at` bookkeeping for both plain and nullable columns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Microseconds since the Unix epoch, UTC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The epoch itself, which doubles as the zero value.
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Build from raw microseconds.
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Raw microseconds since the epoch.
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    /// Current wall-clock time. Clocks set before 1970 read as the epoch.
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX));
        Self(micros)
    }

    /// Convert to a `SystemTime` for drivers that bind timestamps natively.
    pub fn to_system_time(self) -> SystemTime {
        let abs = std::time::Duration::from_micros(self.0.unsigned_abs());
        if self.0 >= 0 {
            UNIX_EPOCH + abs
        } else {
            UNIX_EPOCH - abs
        }
    }

    /// Inverse of [`Timestamp::to_system_time`].
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Self(i64::try_from(d.as_micros()).unwrap_or(i64::MAX)),
            Err(e) => Self(-i64::try_from(e.duration().as_micros()).unwrap_or(i64::MAX)),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

/// Whether a field holds its type's zero value.
///
/// Defaulted columns whose field is zero are left out of INSERT statements so
/// the database default applies. `Option<T>` is zero only when `None`, so
/// `Some(0)` is still sent explicitly.
pub trait IsZero {
    fn is_zero(&self) -> bool;
}

macro_rules! impl_is_zero_num {
    ($($t:ty),*) => {
        $(impl IsZero for $t {
            fn is_zero(&self) -> bool {
                *self == 0 as $t
            }
        })*
    };
}

impl_is_zero_num!(i16, i32, i64, f32, f64);

impl IsZero for bool {
    fn is_zero(&self) -> bool {
        !*self
    }
}

impl IsZero for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl IsZero for Vec<u8> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl IsZero for Timestamp {
    fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl IsZero for serde_json::Value {
    fn is_zero(&self) -> bool {
        self.is_null()
    }
}

impl<T> IsZero for Option<T> {
    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

/// Automatic timestamp assignment for `created_at`/`updated_at` style fields.
pub trait Stamp {
    /// Set the field to `now` only when it is still zero.
    fn stamp_if_zero(&mut self, now: Timestamp);
    /// Set the field to `now` unconditionally.
    fn stamp(&mut self, now: Timestamp);
}

impl Stamp for Timestamp {
    fn stamp_if_zero(&mut self, now: Timestamp) {
        if self.is_zero() {
            *self = now;
        }
    }

    fn stamp(&mut self, now: Timestamp) {
        *self = now;
    }
}

impl Stamp for Option<Timestamp> {
    fn stamp_if_zero(&mut self, now: Timestamp) {
        if self.is_none_or(|ts| ts.is_zero()) {
            *self = Some(now);
        }
    }

    fn stamp(&mut self, now: Timestamp) {
        *self = Some(now);
    }
}
