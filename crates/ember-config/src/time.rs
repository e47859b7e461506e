//! Time periods with fixed integer units.
//!
//! A [`TimePeriod`] stores integer quantities per unit (microseconds through
//! days). Fractional quantities given at construction are canonicalized by
//! cascading the fractional part into the next finer unit; anything finer
//! than a microsecond is rejected. Ordering and equality use the total
//! microsecond projection, so `2000 ms` and `2 s` compare equal.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Error produced when a time period cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimePeriodError {
    #[error("maximum precision is microseconds")]
    SubMicrosecond,
    #[error("time period must not be negative")]
    Negative,
}

/// A span of time as integer quantities in fixed units.
///
/// Fields are `None` when the unit was not given, which keeps the unit the
/// user wrote observable for display while comparisons use the total.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TimePeriod {
    pub microseconds: Option<i64>,
    pub milliseconds: Option<i64>,
    pub seconds: Option<i64>,
    pub minutes: Option<i64>,
    pub hours: Option<i64>,
    pub days: Option<i64>,
}

/// The unit a period is lowered to when emitted as an integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

fn is_approximately_integer(value: f64) -> bool {
    (value - value.round()).abs() < 0.001
}

/// Split a fractional quantity into its integer part and the carry into the
/// next finer unit.
fn carry(value: f64, factor: f64) -> (i64, f64) {
    if is_approximately_integer(value) {
        (value.round() as i64, 0.0)
    } else {
        (value.trunc() as i64, value.fract() * factor)
    }
}

impl TimePeriod {
    /// Build a period from per-unit quantities, canonicalizing fractional
    /// parts into finer units.
    pub fn new(
        microseconds: Option<f64>,
        milliseconds: Option<f64>,
        seconds: Option<f64>,
        minutes: Option<f64>,
        hours: Option<f64>,
        days: Option<f64>,
    ) -> Result<Self, TimePeriodError> {
        for v in [microseconds, milliseconds, seconds, minutes, hours, days]
            .into_iter()
            .flatten()
        {
            if v < 0.0 {
                return Err(TimePeriodError::Negative);
            }
        }

        let mut out = TimePeriod::default();
        let mut hours = hours;
        let mut minutes = minutes;
        let mut seconds = seconds;
        let mut milliseconds = milliseconds;
        let mut microseconds = microseconds;

        if let Some(d) = days {
            let (whole, frac) = carry(d, 24.0);
            out.days = Some(whole);
            if frac != 0.0 {
                hours = Some(hours.unwrap_or(0.0) + frac);
            }
        }
        if let Some(h) = hours {
            let (whole, frac) = carry(h, 60.0);
            out.hours = Some(whole);
            if frac != 0.0 {
                minutes = Some(minutes.unwrap_or(0.0) + frac);
            }
        }
        if let Some(m) = minutes {
            let (whole, frac) = carry(m, 60.0);
            out.minutes = Some(whole);
            if frac != 0.0 {
                seconds = Some(seconds.unwrap_or(0.0) + frac);
            }
        }
        if let Some(s) = seconds {
            let (whole, frac) = carry(s, 1000.0);
            out.seconds = Some(whole);
            if frac != 0.0 {
                milliseconds = Some(milliseconds.unwrap_or(0.0) + frac);
            }
        }
        if let Some(ms) = milliseconds {
            let (whole, frac) = carry(ms, 1000.0);
            out.milliseconds = Some(whole);
            if frac != 0.0 {
                microseconds = Some(microseconds.unwrap_or(0.0) + frac);
            }
        }
        if let Some(us) = microseconds {
            if !is_approximately_integer(us) {
                return Err(TimePeriodError::SubMicrosecond);
            }
            out.microseconds = Some(us.round() as i64);
        }

        Ok(out)
    }

    pub fn from_microseconds(us: i64) -> Self {
        Self {
            microseconds: Some(us),
            ..Default::default()
        }
    }

    pub fn from_milliseconds(ms: i64) -> Self {
        Self {
            milliseconds: Some(ms),
            ..Default::default()
        }
    }

    pub fn from_seconds(s: i64) -> Self {
        Self {
            seconds: Some(s),
            ..Default::default()
        }
    }

    pub fn from_minutes(min: i64) -> Self {
        Self {
            minutes: Some(min),
            ..Default::default()
        }
    }

    /// The ordering key. Every other `total_*` projection truncates this,
    /// so subunit overflow (`2000 ms`) reads the same as the coarser
    /// spelling (`2 s`).
    pub fn total_microseconds(&self) -> i64 {
        self.microseconds.unwrap_or(0)
            + self.milliseconds.unwrap_or(0) * 1_000
            + self.seconds.unwrap_or(0) * 1_000_000
            + self.minutes.unwrap_or(0) * 60_000_000
            + self.hours.unwrap_or(0) * 3_600_000_000
            + self.days.unwrap_or(0) * 86_400_000_000
    }

    pub fn total_milliseconds(&self) -> i64 {
        self.total_microseconds() / 1_000
    }

    pub fn total_seconds(&self) -> i64 {
        self.total_microseconds() / 1_000_000
    }

    pub fn total_minutes(&self) -> i64 {
        self.total_microseconds() / 60_000_000
    }

    pub fn total_hours(&self) -> i64 {
        self.total_microseconds() / 3_600_000_000
    }

    pub fn total_days(&self) -> i64 {
        self.total_microseconds() / 86_400_000_000
    }

    /// Total quantity in the given unit, truncating.
    pub fn total_in(&self, unit: TimeUnit) -> i64 {
        match unit {
            TimeUnit::Microseconds => self.total_microseconds(),
            TimeUnit::Milliseconds => self.total_milliseconds(),
            TimeUnit::Seconds => self.total_seconds(),
            TimeUnit::Minutes => self.total_minutes(),
            TimeUnit::Hours => self.total_hours(),
            TimeUnit::Days => self.total_days(),
        }
    }
}

impl PartialEq for TimePeriod {
    fn eq(&self, other: &Self) -> bool {
        self.total_microseconds() == other.total_microseconds()
    }
}

impl Eq for TimePeriod {}

impl PartialOrd for TimePeriod {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimePeriod {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total_microseconds().cmp(&other.total_microseconds())
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.microseconds.is_some() {
            write!(f, "{}us", self.total_microseconds())
        } else if self.milliseconds.is_some() {
            write!(f, "{}ms", self.total_milliseconds())
        } else if self.seconds.is_some() {
            write!(f, "{}s", self.total_seconds())
        } else if self.minutes.is_some() {
            write!(f, "{}min", self.total_minutes())
        } else if self.hours.is_some() {
            write!(f, "{}h", self.total_hours())
        } else if self.days.is_some() {
            write!(f, "{}d", self.total_days())
        } else {
            write!(f, "0s")
        }
    }
}
