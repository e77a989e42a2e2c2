//! DATE / DATE-TIME values and recurrence identifiers.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use super::{DateTime, DateTimeForm};

/// A DATE or DATE-TIME value, as found in DTSTART, RDATE, EXDATE and RECURRENCE-ID.
///
/// The anchor of a series is a `DateValue`; every generated occurrence inherits
/// its variant and, for DATE-TIME, its form. Only the civil fields change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum DateValue {
    /// DATE value (RFC 5545 §3.3.4), no time component.
    Date(NaiveDate),
    /// DATE-TIME value (RFC 5545 §3.3.5).
    DateTime(DateTime),
}

impl DateValue {
    #[must_use]
    pub const fn date(date: NaiveDate) -> Self {
        Self::Date(date)
    }

    #[must_use]
    pub const fn floating(civil: NaiveDateTime) -> Self {
        Self::DateTime(DateTime::floating(civil))
    }

    #[must_use]
    pub const fn utc(civil: NaiveDateTime) -> Self {
        Self::DateTime(DateTime::utc(civil))
    }

    #[must_use]
    pub fn zoned(civil: NaiveDateTime, tzid: impl Into<String>) -> Self {
        Self::DateTime(DateTime::zoned(civil, tzid))
    }

    /// Returns whether this is a DATE (no time component).
    #[must_use]
    pub const fn is_date(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Wall-clock value; DATE values sit at midnight.
    #[must_use]
    pub fn civil(&self) -> NaiveDateTime {
        match self {
            Self::Date(d) => d.and_time(NaiveTime::MIN),
            Self::DateTime(dt) => dt.civil,
        }
    }

    #[must_use]
    pub fn civil_date(&self) -> NaiveDate {
        match self {
            Self::Date(d) => *d,
            Self::DateTime(dt) => dt.date(),
        }
    }

    /// DATE-TIME form, `None` for DATE values.
    #[must_use]
    pub const fn form(&self) -> Option<&DateTimeForm> {
        match self {
            Self::Date(_) => None,
            Self::DateTime(dt) => Some(&dt.form),
        }
    }

    /// Returns a value of the same kind and form with different civil fields.
    ///
    /// For DATE values the time of day is dropped.
    #[must_use]
    pub fn with_civil(&self, civil: NaiveDateTime) -> Self {
        match self {
            Self::Date(_) => Self::Date(civil.date()),
            Self::DateTime(dt) => Self::DateTime(DateTime::new(civil, dt.form.clone())),
        }
    }

    /// Identifier of the logical instance starting at this value.
    #[must_use]
    pub fn recurrence_id(&self) -> RecurrenceId {
        RecurrenceId::from(self)
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{}", d.format("%Y%m%d")),
            Self::DateTime(dt) => write!(f, "{dt}"),
        }
    }
}

impl From<NaiveDate> for DateValue {
    fn from(date: NaiveDate) -> Self {
        Self::Date(date)
    }
}

impl From<DateTime> for DateValue {
    fn from(dt: DateTime) -> Self {
        Self::DateTime(dt)
    }
}

/// Canonical key of one logical instance in a series.
///
/// The key is the basic-format text of the instance's unmodified start value
/// (`YYYYMMDD`, `YYYYMMDDTHHMMSS` or `YYYYMMDDTHHMMSSZ`). Values must be in the
/// anchor's frame before keys are compared; the zone name is not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RecurrenceId(String);

impl RecurrenceId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&DateValue> for RecurrenceId {
    fn from(value: &DateValue) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for RecurrenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn civil(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, 0, 0))
            .expect("valid civil time")
    }

    #[test]
    fn date_value_display() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).expect("leap day");
        assert_eq!(DateValue::date(date).to_string(), "20240229");
        assert_eq!(
            DateValue::utc(civil(2024, 2, 29, 8)).to_string(),
            "20240229T080000Z"
        );
    }

    #[test]
    fn with_civil_keeps_kind_and_form() {
        let anchor = DateValue::zoned(civil(2024, 1, 1, 9), "Europe/Berlin");
        let next = anchor.with_civil(civil(2024, 1, 2, 9));
        assert_eq!(next.form(), anchor.form());
        assert_eq!(next.civil(), civil(2024, 1, 2, 9));

        let date_anchor = DateValue::date(civil(2024, 1, 1, 0).date());
        let moved = date_anchor.with_civil(civil(2024, 3, 4, 17));
        assert!(moved.is_date());
        assert_eq!(moved.to_string(), "20240304");
    }

    #[test]
    fn recurrence_id_ignores_zone_name() {
        let berlin = DateValue::zoned(civil(2024, 1, 1, 9), "Europe/Berlin");
        let floating = DateValue::floating(civil(2024, 1, 1, 9));
        assert_eq!(berlin.recurrence_id(), floating.recurrence_id());
        assert_ne!(
            berlin.recurrence_id(),
            DateValue::utc(civil(2024, 1, 1, 9)).recurrence_id()
        );
    }
}
