//! Fixed-point simulation time.
//!
//! HELICS represents simulation time as a signed 64-bit count of nanoseconds
//! rather than as a floating point seconds value, so that time comparisons
//! and arithmetic across federates are exact regardless of platform.

use std::fmt::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point (or duration) in simulation time, in nanoseconds.
///
/// Arithmetic saturates at [`Time::MAX_TIME`] / [`Time::MIN_TIME`] instead of
/// overflowing or panicking: a federate that requests a time past the end of
/// the simulation should still compare and grant sensibly rather than wrap
/// around.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Time(i64);

impl Time {
    /// One nanosecond, the smallest representable non-zero duration.
    pub const EPSILON: Time = Time(1);
    /// The zero time, the start of a federation's execution.
    pub const ZERO: Time = Time(0);
    /// The largest finite time a federate can request or be granted.
    pub const MAX_TIME: Time = Time(i64::MAX - 1);
    /// Sentinel representing "no further time will ever be requested".
    pub const MIN_TIME: Time = Time(i64::MIN + 1);

    pub const fn new(nanoseconds: i64) -> Self {
        Time(nanoseconds)
    }

    pub const fn from_seconds(seconds: f64) -> Self {
        Time((seconds * 1_000_000_000.0) as i64)
    }

    pub const fn as_nanoseconds(&self) -> i64 {
        self.0
    }

    pub fn as_seconds(&self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }

    /// Saturating addition; never overflows past [`Time::MAX_TIME`].
    pub fn saturating_add(self, rhs: Time) -> Time {
        Time(self.0.saturating_add(rhs.0)).clamp_to_bounds()
    }

    /// Saturating subtraction; never underflows past [`Time::MIN_TIME`].
    pub fn saturating_sub(self, rhs: Time) -> Time {
        Time(self.0.saturating_sub(rhs.0)).clamp_to_bounds()
    }

    fn clamp_to_bounds(self) -> Time {
        if self.0 >= Time::MAX_TIME.0 {
            Time::MAX_TIME
        } else if self.0 <= Time::MIN_TIME.0 {
            Time::MIN_TIME
        } else {
            self
        }
    }

    pub fn is_max(&self) -> bool {
        *self >= Time::MAX_TIME
    }
}

impl std::ops::Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        self.saturating_add(rhs)
    }
}

impl std::ops::Sub for Time {
    type Output = Time;

    fn sub(self, rhs: Time) -> Time {
        self.saturating_sub(rhs)
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Time::MAX_TIME {
            write!(f, "max_time")
        } else {
            write!(f, "{:.9}", self.as_seconds())
        }
    }
}

impl From<i64> for Time {
    fn from(nanoseconds: i64) -> Self {
        Time(nanoseconds)
    }
}

impl From<Time> for i64 {
    fn from(time: Time) -> Self {
        time.0
    }
}
