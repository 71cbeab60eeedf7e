//! Time source for progression.
//!
//! All progression reasoning (streak days, hour windows, weekends) happens on
//! the local wall clock, so the clock hands out `NaiveDateTime` values.

use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};

/// Wall-clock format accepted by [`parse_local`].
pub const LOCAL_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub trait Clock {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Reads the system clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant. Used by tests and by `QUESTLOG_NOW`.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Parse a `YYYY-MM-DDTHH:MM:SS` local timestamp.
pub fn parse_local(raw: &str) -> Result<NaiveDateTime> {
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, LOCAL_TIME_FORMAT).map_err(|err| {
        Error::InvalidArgument(format!(
            "invalid local time '{trimmed}' (expected YYYY-MM-DDTHH:MM:SS): {err}"
        ))
    })
}

/// Pick the clock for a session: pinned when an override is given, system otherwise.
pub fn from_override(raw: Option<&str>) -> Result<Box<dyn Clock>> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => Ok(Box::new(FixedClock(parse_local(value)?))),
        None => Ok(Box::new(SystemClock)),
    }
}
