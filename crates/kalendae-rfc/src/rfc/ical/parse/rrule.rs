//! RECUR value decoding (RFC 5545 §3.3.10, RFC 7265 §3.6.10).
//!
//! Both entry points produce an unvalidated [`RRule`]. Part names are matched
//! case-insensitively; unknown parts are rejected, never skipped.

use serde_json::{Map, Value};

use super::values::parse_date_value;
use crate::rfc::ical::core::{
    DateValue, Frequency, RRule, RRuleUntil, RuleConstraint, RuleError, Weekday, WeekdayNum,
};

const PARTS: [&str; 14] = [
    "FREQ",
    "INTERVAL",
    "UNTIL",
    "COUNT",
    "WKST",
    "BYSECOND",
    "BYMINUTE",
    "BYHOUR",
    "BYDAY",
    "BYMONTHDAY",
    "BYYEARDAY",
    "BYWEEKNO",
    "BYMONTH",
    "BYSETPOS",
];

/// Collects parts into an `RRule`, rejecting repeats.
#[derive(Default)]
struct RRuleBuilder {
    rrule: RRule,
    seen: Vec<&'static str>,
}

impl RRuleBuilder {
    fn part_name(key: &str) -> Result<&'static str, RuleError> {
        let upper = key.trim().to_ascii_uppercase();
        PARTS
            .iter()
            .copied()
            .find(|name| *name == upper)
            .ok_or_else(|| RuleError::UnsupportedRuleKey(key.trim().to_string()))
    }

    fn apply(&mut self, part: &'static str, value: &str) -> Result<(), RuleError> {
        if self.seen.contains(&part) {
            return Err(RuleConstraint::DuplicatePart(part).into());
        }
        self.seen.push(part);

        let value = value.trim();
        let malformed = || RuleConstraint::Malformed {
            part,
            value: value.to_string(),
        };
        let rrule = &mut self.rrule;

        match part {
            "FREQ" => rrule.freq = Some(Frequency::parse(value).ok_or_else(malformed)?),
            "INTERVAL" => rrule.interval = Some(parse_positive(part, value)?),
            "COUNT" => rrule.count = Some(parse_positive(part, value)?),
            "UNTIL" => rrule.until = Some(parse_until(value).ok_or_else(malformed)?),
            "WKST" => rrule.wkst = Some(Weekday::parse(value).ok_or_else(malformed)?),
            "BYSECOND" => rrule.by_second = parse_list(part, value)?,
            "BYMINUTE" => rrule.by_minute = parse_list(part, value)?,
            "BYHOUR" => rrule.by_hour = parse_list(part, value)?,
            "BYDAY" => rrule.by_day = parse_byday(value)?,
            "BYMONTHDAY" => rrule.by_monthday = parse_list(part, value)?,
            "BYYEARDAY" => rrule.by_yearday = parse_list(part, value)?,
            "BYWEEKNO" => rrule.by_weekno = parse_list(part, value)?,
            "BYMONTH" => rrule.by_month = parse_list(part, value)?,
            "BYSETPOS" => rrule.by_setpos = parse_list(part, value)?,
            _ => return Err(RuleError::UnsupportedRuleKey(part.to_string())),
        }
        Ok(())
    }
}

/// ## Summary
/// Decodes RECUR text, e.g. `FREQ=MONTHLY;BYDAY=-1FR;COUNT=6`.
///
/// An `RRULE:` property prefix and empty segments (a trailing `;`) are tolerated.
///
/// ## Errors
/// Returns `UnsupportedRuleKey` for unknown parts, and a validation error for
/// malformed values, out-of-range numbers or repeated parts.
pub fn parse_rrule(text: &str) -> Result<RRule, RuleError> {
    let text = text.trim();
    let body = match text.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("RRULE:") => &text[6..],
        _ => text,
    };

    let mut builder = RRuleBuilder::default();
    for segment in body.split(';').filter(|s| !s.trim().is_empty()) {
        let (key, value) = segment.split_once('=').ok_or_else(|| RuleConstraint::Malformed {
            part: "RRULE",
            value: segment.to_string(),
        })?;
        let part = RRuleBuilder::part_name(key)?;
        builder.apply(part, value)?;
    }

    Ok(builder.rrule)
}

/// ## Summary
/// Decodes an already structured rule, as carried by jCal `recur` values.
///
/// Values may be strings, numbers, or arrays of those. UNTIL accepts both the
/// basic (`20240601T130000Z`) and extended (`2024-06-01T13:00:00Z`) forms.
///
/// ## Errors
/// Same as [`parse_rrule`]; nested objects or booleans are malformed values.
pub fn parse_rrule_map(map: &Map<String, Value>) -> Result<RRule, RuleError> {
    let mut builder = RRuleBuilder::default();
    for (key, value) in map {
        let part = RRuleBuilder::part_name(key)?;
        let text = stringify(value).ok_or_else(|| RuleConstraint::Malformed {
            part,
            value: value.to_string(),
        })?;
        builder.apply(part, &text)?;
    }

    Ok(builder.rrule)
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Option<Vec<String>> = items
                .iter()
                .map(|item| match item {
                    Value::Array(_) => None,
                    other => stringify(other),
                })
                .collect();
            parts.map(|p| p.join(","))
        }
        Value::Null | Value::Bool(_) | Value::Object(_) => None,
    }
}

fn parse_positive(part: &'static str, value: &str) -> Result<u32, RuleConstraint> {
    let n: i64 = value.parse().map_err(|_e| RuleConstraint::Malformed {
        part,
        value: value.to_string(),
    })?;
    u32::try_from(n).map_err(|_e| RuleConstraint::OutOfRange { part, value: n })
}

fn parse_until(value: &str) -> Option<RRuleUntil> {
    let basic: String = value.chars().filter(|c| *c != '-' && *c != ':').collect();
    parse_date_value(&basic, None, 1, 1).ok().map(|v| match v {
        DateValue::Date(d) => RRuleUntil::Date(d),
        DateValue::DateTime(dt) => RRuleUntil::DateTime(dt),
    })
}

fn parse_list<T>(part: &'static str, value: &str) -> Result<Vec<T>, RuleConstraint>
where
    T: TryFrom<i64>,
{
    value
        .split(',')
        .map(|entry| {
            let entry = entry.trim();
            let n: i64 = entry.parse().map_err(|_e| RuleConstraint::Malformed {
                part,
                value: entry.to_string(),
            })?;
            T::try_from(n).map_err(|_e| RuleConstraint::OutOfRange { part, value: n })
        })
        .collect()
}

/// Parses BYDAY entries such as `MO`, `+2TU` or `-1FR`.
fn parse_byday(value: &str) -> Result<Vec<WeekdayNum>, RuleConstraint> {
    value
        .split(',')
        .map(|entry| {
            let entry = entry.trim();
            let malformed = || RuleConstraint::Malformed {
                part: "BYDAY",
                value: entry.to_string(),
            };
            let split = entry.len().checked_sub(2).ok_or_else(malformed)?;
            let (ordinal, day) = (entry.get(..split), entry.get(split..));
            let weekday = day.and_then(Weekday::parse).ok_or_else(malformed)?;

            match ordinal.ok_or_else(malformed)? {
                "" => Ok(WeekdayNum::every(weekday)),
                ordinal => {
                    let n: i64 = ordinal.parse().map_err(|_e| malformed())?;
                    let n = i8::try_from(n).map_err(|_e| RuleConstraint::OutOfRange {
                        part: "BYDAY",
                        value: n,
                    })?;
                    Ok(WeekdayNum::nth(n, weekday))
                }
            }
        })
        .collect()
}
