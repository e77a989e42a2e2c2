//! DATE-TIME value type (RFC 5545 §3.3.5).

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

/// Form of DATE-TIME value (RFC 5545 §3.3.5).
///
/// iCalendar DATE-TIME values come in three mutually exclusive forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum DateTimeForm {
    /// Floating time - same wall-clock time in any timezone.
    ///
    /// Example: `19980118T230000`
    Floating,

    /// UTC time - absolute instant, indicated by 'Z' suffix.
    ///
    /// Example: `19980119T070000Z`
    Utc,

    /// Zoned time - local time with TZID reference.
    ///
    /// Example: `TZID=America/New_York:19980119T020000`
    Zoned {
        /// The timezone identifier as written in the TZID parameter.
        tzid: String,
    },
}

/// DATE-TIME value (RFC 5545 §3.3.5).
///
/// Civil fields are kept as a `chrono` wall-clock value; the form says how to
/// place that wall clock on the UTC line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DateTime {
    /// Wall-clock date and time.
    pub civil: NaiveDateTime,
    /// The form of this DATE-TIME (floating, UTC, or zoned).
    pub form: DateTimeForm,
}

impl DateTime {
    #[must_use]
    pub const fn new(civil: NaiveDateTime, form: DateTimeForm) -> Self {
        Self { civil, form }
    }

    /// Creates a floating DATE-TIME.
    #[must_use]
    pub const fn floating(civil: NaiveDateTime) -> Self {
        Self::new(civil, DateTimeForm::Floating)
    }

    /// Creates a UTC DATE-TIME.
    #[must_use]
    pub const fn utc(civil: NaiveDateTime) -> Self {
        Self::new(civil, DateTimeForm::Utc)
    }

    /// Creates a zoned DATE-TIME.
    #[must_use]
    pub fn zoned(civil: NaiveDateTime, tzid: impl Into<String>) -> Self {
        Self::new(civil, DateTimeForm::Zoned { tzid: tzid.into() })
    }

    /// Returns whether this is a UTC time.
    #[must_use]
    pub fn is_utc(&self) -> bool {
        matches!(self.form, DateTimeForm::Utc)
    }

    /// Returns whether this is a floating time.
    #[must_use]
    pub fn is_floating(&self) -> bool {
        matches!(self.form, DateTimeForm::Floating)
    }

    /// Returns the timezone ID if this is a zoned time.
    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        match &self.form {
            DateTimeForm::Zoned { tzid } => Some(tzid),
            _ => None,
        }
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.civil.date()
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.civil;
        write!(
            f,
            "{:04}{:02}{:02}T{:02}{:02}{:02}",
            c.year(),
            c.month(),
            c.day(),
            c.hour(),
            c.minute(),
            c.second()
        )?;
        if self.is_utc() {
            write!(f, "Z")?;
        }
        Ok(())
    }
}
