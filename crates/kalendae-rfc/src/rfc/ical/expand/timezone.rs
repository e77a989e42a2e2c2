//! Timezone resolution and frame conversion for DATE / DATE-TIME values.
//!
//! Uses ICU4X for Windows timezone ID to IANA mapping and timezone canonicalization.

use chrono::{LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use icu::time::zone::WindowsParser;
use icu::time::zone::iana::IanaParserExtended;
use std::collections::HashMap;
use std::str::FromStr;

use crate::rfc::ical::core::{DateTimeForm, DateValue};

/// Error during timezone conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// Unknown or invalid timezone identifier.
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// Non-existent time during DST gap.
    #[error("Non-existent time (DST gap): {0}")]
    NonExistentTime(String),

    /// Result falls outside the representable range.
    #[error("Invalid datetime: {0}")]
    InvalidDateTime(String),
}

/// Resolver for timezone identifiers, caching every successful lookup.
#[derive(Debug, Clone, Default)]
pub struct TimeZoneResolver {
    /// Cache of resolved IANA timezones by TZID.
    cache: HashMap<String, Tz>,
}

impl TimeZoneResolver {
    /// Creates a new timezone resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Resolves a timezone identifier to a `chrono_tz::Tz`.
    ///
    /// Common CalDAV/iCalendar TZIDs (Windows names, vendor prefixes, IANA
    /// aliases) are mapped to their canonical IANA equivalents first.
    ///
    /// ## Errors
    /// Returns `ConversionError::UnknownTimezone` if the TZID cannot be resolved.
    ///
    /// ## Side Effects
    /// Caches successful resolutions to avoid repeated parsing.
    pub fn resolve(&mut self, tzid: &str) -> Result<Tz, ConversionError> {
        if let Some(tz) = self.cache.get(tzid) {
            return Ok(*tz);
        }

        let normalized = normalize_tzid(tzid);
        let tz = Tz::from_str(&normalized)
            .map_err(|_e| ConversionError::UnknownTimezone(tzid.to_string()))?;

        self.cache.insert(tzid.to_string(), tz);
        Ok(tz)
    }
}

/// Normalizes common CalDAV/iCalendar timezone identifiers to IANA names.
fn normalize_tzid(tzid: &str) -> String {
    let stripped = tzid
        .strip_prefix("/mozilla.org/")
        .or_else(|| tzid.strip_prefix("/softwarestudio.org/"))
        .unwrap_or(tzid);

    let windows_parser = WindowsParser::new();
    if let Some(tz) = windows_parser.parse(stripped, None) {
        let iana_parser = IanaParserExtended::new();
        for entry in iana_parser.iter() {
            if entry.time_zone == tz {
                return entry.canonical.to_string();
            }
        }
    }

    // Aliases such as Europe/Kiev -> Europe/Kyiv
    let iana_parser = IanaParserExtended::new();
    let parsed = iana_parser.parse(stripped);
    if parsed.time_zone != icu::time::TimeZone::UNKNOWN {
        return parsed.canonical.to_string();
    }

    stripped.to_string()
}

/// ## Summary
/// Converts a wall-clock time in `tzid` to UTC.
///
/// A time repeated by a DST fold resolves to its first (earlier) instant.
///
/// ## Errors
/// Returns an error if the zone is unknown or the time falls in a DST gap.
///
/// ## Side Effects
/// Updates the resolver's cache if a new timezone is resolved.
pub fn convert_to_utc(
    local_time: NaiveDateTime,
    tzid: &str,
    resolver: &mut TimeZoneResolver,
) -> Result<chrono::DateTime<Utc>, ConversionError> {
    let tz = resolver.resolve(tzid)?;

    match tz.from_local_datetime(&local_time) {
        LocalResult::None => Err(ConversionError::NonExistentTime(format!(
            "{local_time} in timezone {tzid}"
        ))),
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _latest) => Ok(earliest.with_timezone(&Utc)),
    }
}

/// ## Summary
/// Like [`convert_to_utc`], but a time inside a DST gap is shifted forward one hour.
///
/// ## Errors
/// Returns an error if the timezone cannot be resolved.
pub fn convert_to_utc_lenient(
    local_time: NaiveDateTime,
    tzid: &str,
    resolver: &mut TimeZoneResolver,
) -> Result<chrono::DateTime<Utc>, ConversionError> {
    match convert_to_utc(local_time, tzid, resolver) {
        Err(ConversionError::NonExistentTime(_)) => {
            let shifted = local_time
                .checked_add_signed(chrono::TimeDelta::hours(1))
                .ok_or_else(|| ConversionError::InvalidDateTime(local_time.to_string()))?;
            convert_to_utc(shifted, tzid, resolver)
        }
        other => other,
    }
}

/// ## Summary
/// Converts a UTC wall-clock value to the wall clock of `tzid`.
///
/// ## Errors
/// Returns an error if the timezone cannot be resolved.
pub fn convert_from_utc(
    utc: NaiveDateTime,
    tzid: &str,
    resolver: &mut TimeZoneResolver,
) -> Result<NaiveDateTime, ConversionError> {
    let tz = resolver.resolve(tzid)?;
    Ok(tz.from_utc_datetime(&utc).naive_local())
}

/// ## Summary
/// Places a value on the UTC line.
///
/// DATE values start at midnight. Floating values are read in `floating_zone`
/// when given, otherwise as UTC.
///
/// ## Errors
/// Returns an error if a zone cannot be resolved.
pub fn instant_of(
    value: &DateValue,
    floating_zone: Option<&str>,
    resolver: &mut TimeZoneResolver,
) -> Result<chrono::DateTime<Utc>, ConversionError> {
    let civil = value.civil();
    let tzid = match value.form() {
        Some(DateTimeForm::Utc) => None,
        Some(DateTimeForm::Zoned { tzid }) => Some(tzid.as_str()),
        Some(DateTimeForm::Floating) | None => floating_zone,
    };

    match tzid {
        Some(tzid) => convert_to_utc_lenient(civil, tzid, resolver),
        None => Ok(civil.and_utc()),
    }
}

/// ## Summary
/// Re-expresses `value` in the frame of `anchor` so that recurrence identifiers
/// of both can be compared textually.
///
/// - DATE anchor: the value's calendar date.
/// - DATE value on a DATE-TIME anchor: that date at the anchor's time of day.
/// - Floating anchor: the value's wall clock.
/// - UTC or zoned anchor: the same instant on the anchor's wall clock.
///
/// When a zone cannot be resolved the wall clock is kept as written and a
/// warning is logged.
pub fn coerce_to_frame(
    value: &DateValue,
    anchor: &DateValue,
    resolver: &mut TimeZoneResolver,
) -> DateValue {
    let DateValue::DateTime(anchor_dt) = anchor else {
        return DateValue::Date(value.civil_date());
    };

    let civil = match value {
        DateValue::Date(d) => d.and_time(anchor_dt.civil.time()),
        DateValue::DateTime(dt) => match reframe(dt.civil, &dt.form, &anchor_dt.form, resolver) {
            Ok(civil) => civil,
            Err(e) => {
                tracing::warn!(
                    value = %value,
                    error = %e,
                    "Could not convert value into the series timezone, comparing wall clocks"
                );
                dt.civil
            }
        },
    };

    anchor.with_civil(civil)
}

fn reframe(
    civil: NaiveDateTime,
    from: &DateTimeForm,
    to: &DateTimeForm,
    resolver: &mut TimeZoneResolver,
) -> Result<NaiveDateTime, ConversionError> {
    match (from, to) {
        (_, DateTimeForm::Floating)
        | (DateTimeForm::Floating | DateTimeForm::Utc, DateTimeForm::Utc)
        | (DateTimeForm::Floating, DateTimeForm::Zoned { .. }) => Ok(civil),
        (DateTimeForm::Zoned { tzid }, DateTimeForm::Utc) => {
            Ok(convert_to_utc_lenient(civil, tzid, resolver)?.naive_utc())
        }
        (DateTimeForm::Utc, DateTimeForm::Zoned { tzid }) => {
            convert_from_utc(civil, tzid, resolver)
        }
        (DateTimeForm::Zoned { tzid: source }, DateTimeForm::Zoned { tzid: target }) => {
            if source == target {
                return Ok(civil);
            }
            let utc = convert_to_utc_lenient(civil, source, resolver)?;
            convert_from_utc(utc.naive_utc(), target, resolver)
        }
    }
}
