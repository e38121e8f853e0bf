//! Calendar helpers for bookings and slots.
//!
//! Dates travel as `YYYY-MM-DD`, slots as `HH:MM`, instants as RFC 3339.
//! All schedule arithmetic is done in UTC.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

pub fn parse_date(s: &str) -> Result<Date> {
    Date::parse(s.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|e| CoreError::invalid_date_time(format!("'{s}' is not a YYYY-MM-DD date: {e}")))
}

pub fn parse_slot(s: &str) -> Result<Time> {
    Time::parse(s.trim(), format_description!("[hour]:[minute]"))
        .map_err(|e| CoreError::invalid_date_time(format!("'{s}' is not a HH:MM slot: {e}")))
}

pub fn format_date(date: Date) -> String {
    // The format is infallible for valid dates.
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

pub fn format_slot(slot: Time) -> String {
    slot.format(format_description!("[hour]:[minute]"))
        .unwrap_or_default()
}

pub fn format_rfc3339(dt: OffsetDateTime) -> String {
    dt.format(&Rfc3339).unwrap_or_default()
}

/// Fixed-width UTC instant used for stored timestamps, so that string order
/// matches chronological order.
pub fn format_timestamp(dt: OffsetDateTime) -> String {
    dt.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
        ))
        .unwrap_or_default()
}

pub fn parse_rfc3339(s: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(s, &Rfc3339)
        .map_err(|e| CoreError::invalid_date_time(format!("'{s}' is not RFC 3339: {e}")))
}

/// Start instant of a slot on a date, in UTC.
pub fn slot_start(date: Date, slot: Time) -> OffsetDateTime {
    PrimitiveDateTime::new(date, slot).assume_utc()
}

/// Relative position of an appointment against the current instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    /// Starts at or after now, any day.
    Upcoming,
    /// Falls on the current calendar day, whatever the hour.
    Today,
    /// Started before now.
    Past,
}

impl TimeWindow {
    pub fn contains(self, date: Date, slot: Time, now: OffsetDateTime) -> bool {
        let start = slot_start(date, slot);
        match self {
            TimeWindow::Upcoming => start >= now,
            TimeWindow::Today => date == now.date(),
            TimeWindow::Past => start < now,
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeWindow::Upcoming => write!(f, "upcoming"),
            TimeWindow::Today => write!(f, "today"),
            TimeWindow::Past => write!(f, "past"),
        }
    }
}

impl FromStr for TimeWindow {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "upcoming" => Ok(TimeWindow::Upcoming),
            "today" => Ok(TimeWindow::Today),
            "past" => Ok(TimeWindow::Past),
            other => Err(CoreError::invalid_field(
                "window",
                format!("'{other}' is not one of upcoming, today, past"),
            )),
        }
    }
}
