//! Value parsers for the properties a recurring series is built from
//! (DTSTART, RDATE, EXDATE, RECURRENCE-ID, DURATION).

use chrono::{NaiveDate, NaiveTime, TimeDelta};

use super::error::{ParseError, ParseErrorKind, ParseResult};
use crate::rfc::ical::core::{DateTime, DateTimeForm, DateValue};

/// Parses a fixed-width run of ASCII digits.
fn digits(s: &str, kind: ParseErrorKind, line: usize, col: usize) -> ParseResult<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::new(kind, line, col).with_context(format!("'{s}'")));
    }
    s.parse::<u32>()
        .map_err(|e| ParseError::new(kind, line, col).with_context(e.to_string()))
}

/// Parses a DATE value (RFC 5545 §3.3.4).
///
/// Format: YYYYMMDD (e.g., "19970714")
///
/// ## Errors
/// Returns an error if the string is not 8 digits or names a day that does not exist.
pub fn parse_date(s: &str, line: usize, col: usize) -> ParseResult<NaiveDate> {
    let kind = ParseErrorKind::InvalidDate;
    if s.len() != 8 || !s.is_ascii() {
        return Err(ParseError::new(kind, line, col).with_context("expected YYYYMMDD"));
    }

    let year = digits(&s[0..4], kind, line, col)?;
    let month = digits(&s[4..6], kind, line, col + 4)?;
    let day = digits(&s[6..8], kind, line, col + 6)?;

    i32::try_from(year)
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
        .ok_or_else(|| ParseError::new(kind, line, col).with_context(format!("no such day '{s}'")))
}

/// Parses a TIME value (RFC 5545 §3.3.12) and reports whether it carried a `Z` suffix.
///
/// Format: HHMMSS[Z]. A leap second (`60`) is folded onto second 59.
///
/// ## Errors
/// Returns an error if the string is not a valid 6-digit time.
pub fn parse_time(s: &str, line: usize, col: usize) -> ParseResult<(NaiveTime, bool)> {
    let kind = ParseErrorKind::InvalidTime;
    let (time_str, is_utc) = match s.strip_suffix('Z') {
        Some(stripped) => (stripped, true),
        None => (s, false),
    };

    if time_str.len() != 6 || !time_str.is_ascii() {
        return Err(ParseError::new(kind, line, col).with_context("expected HHMMSS"));
    }

    let hour = digits(&time_str[0..2], kind, line, col)?;
    let minute = digits(&time_str[2..4], kind, line, col + 2)?;
    let second = digits(&time_str[4..6], kind, line, col + 4)?;
    if second > 60 {
        return Err(ParseError::new(kind, line, col + 4));
    }

    let time = NaiveTime::from_hms_opt(hour, minute, second.min(59))
        .ok_or_else(|| ParseError::new(kind, line, col).with_context(format!("'{s}'")))?;
    Ok((time, is_utc))
}

/// Parses a DATE-TIME value (RFC 5545 §3.3.5).
///
/// Format: YYYYMMDD"T"HHMMSS[Z] (e.g., "19970714T133000Z"). `tzid` is the
/// TZID parameter of the property; it is ignored for UTC values.
///
/// ## Errors
/// Returns an error if the date or time portion is invalid.
pub fn parse_datetime(
    s: &str,
    tzid: Option<&str>,
    line: usize,
    col: usize,
) -> ParseResult<DateTime> {
    let t_pos = s.find('T').ok_or_else(|| {
        ParseError::new(ParseErrorKind::InvalidDateTime, line, col).with_context("missing 'T'")
    })?;

    let date = parse_date(&s[..t_pos], line, col)?;
    let (time, is_utc) = parse_time(&s[t_pos + 1..], line, col + t_pos + 1)?;

    let form = match (is_utc, tzid) {
        (true, _) => DateTimeForm::Utc,
        (false, Some(tz)) => DateTimeForm::Zoned {
            tzid: tz.to_string(),
        },
        (false, None) => DateTimeForm::Floating,
    };

    Ok(DateTime::new(date.and_time(time), form))
}

/// Parses a value that may be either DATE or DATE-TIME, deciding by the `T` separator.
///
/// ## Errors
/// Returns an error if the value is neither a valid DATE nor a valid DATE-TIME.
pub fn parse_date_value(
    s: &str,
    tzid: Option<&str>,
    line: usize,
    col: usize,
) -> ParseResult<DateValue> {
    if s.is_empty() {
        return Err(ParseError::new(ParseErrorKind::EmptyValue, line, col));
    }
    if s.contains('T') {
        parse_datetime(s, tzid, line, col).map(DateValue::DateTime)
    } else {
        parse_date(s, line, col).map(DateValue::Date)
    }
}

/// Parses a comma-separated RDATE / EXDATE value list.
///
/// PERIOD entries (`start/end` or `start/duration`) contribute their start.
///
/// ## Errors
/// Returns an error for the first entry that fails to parse.
pub fn parse_date_list(
    s: &str,
    tzid: Option<&str>,
    line: usize,
    col: usize,
) -> ParseResult<Vec<DateValue>> {
    let mut values = Vec::new();
    let mut offset = 0;

    for entry in s.split(',') {
        let entry_col = col + offset;
        offset += entry.len() + 1;

        let entry = entry.trim();
        let start = match entry.split_once('/') {
            Some((start, end)) => {
                if end.is_empty() {
                    return Err(ParseError::new(ParseErrorKind::InvalidPeriod, line, entry_col)
                        .with_context(format!("'{entry}'")));
                }
                start
            }
            None => entry,
        };
        values.push(parse_date_value(start, tzid, line, entry_col)?);
    }

    Ok(values)
}

/// Parses a DURATION value (RFC 5545 §3.3.6) into a signed time delta.
///
/// Format: `[+-]P[nW]` or `[+-]P[nD][T[nH][nM][nS]]`.
///
/// ## Errors
/// Returns an error for a missing `P`, unknown designators, or a designator
/// without a preceding number.
pub fn parse_duration(s: &str, line: usize, col: usize) -> ParseResult<TimeDelta> {
    let err = || {
        ParseError::new(ParseErrorKind::InvalidDuration, line, col).with_context(format!("'{s}'"))
    };

    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let body = rest.strip_prefix('P').ok_or_else(err)?;
    if body.is_empty() {
        return Err(err());
    }

    let mut seconds: i64 = 0;
    let mut number: Option<i64> = None;
    let mut in_time = false;
    let mut saw_component = false;

    for c in body.chars() {
        if let Some(d) = c.to_digit(10) {
            let acc = number.unwrap_or(0);
            let next = acc.checked_mul(10).and_then(|n| n.checked_add(i64::from(d)));
            number = Some(next.ok_or_else(err)?);
            continue;
        }

        let unit = match (c, in_time) {
            ('T', false) if number.is_none() => {
                in_time = true;
                continue;
            }
            ('W', false) => 7 * 86_400,
            ('D', false) => 86_400,
            ('H', true) => 3_600,
            ('M', true) => 60,
            ('S', true) => 1,
            _ => return Err(err()),
        };
        let n = number.take().ok_or_else(err)?;
        seconds = n
            .checked_mul(unit)
            .and_then(|v| seconds.checked_add(v))
            .ok_or_else(err)?;
        saw_component = true;
    }

    if number.is_some() || !saw_component {
        return Err(err());
    }

    let delta = TimeDelta::try_seconds(seconds).ok_or_else(err)?;
    Ok(if negative { -delta } else { delta })
}
