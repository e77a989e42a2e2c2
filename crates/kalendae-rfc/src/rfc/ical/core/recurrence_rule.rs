//! Validated recurrence rule.
//!
//! All cross-part constraints of RFC 5545 §3.3.10 are checked here, once.
//! Expansion code takes a [`RecurrenceRule`] and never re-validates.

use std::fmt;
use std::str::FromStr;

use super::{Frequency, RRule, RRuleUntil, Weekday, WeekdayNum};

/// The constraint a rule failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleConstraint {
    /// FREQ is mandatory.
    MissingFrequency,
    /// COUNT and UNTIL are mutually exclusive.
    CountWithUntil,
    /// BYWEEKNO is only valid with FREQ=YEARLY.
    WeekNoRequiresYearly,
    /// BYYEARDAY is not valid with FREQ=DAILY, WEEKLY or MONTHLY.
    YearDayWithFrequency(Frequency),
    /// BYMONTHDAY is not valid with FREQ=WEEKLY.
    MonthDayWithWeekly,
    /// INTERVAL must be positive.
    ZeroInterval,
    /// COUNT must be positive.
    ZeroCount,
    /// A numeric value lies outside the range allowed for its part.
    OutOfRange { part: &'static str, value: i64 },
    /// A value could not be decoded at all.
    Malformed { part: &'static str, value: String },
    /// The same part appears twice.
    DuplicatePart(&'static str),
}

impl fmt::Display for RuleConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFrequency => write!(f, "FREQ is required"),
            Self::CountWithUntil => write!(f, "COUNT and UNTIL are mutually exclusive"),
            Self::WeekNoRequiresYearly => write!(f, "BYWEEKNO requires FREQ=YEARLY"),
            Self::YearDayWithFrequency(freq) => {
                write!(f, "BYYEARDAY is not allowed with FREQ={freq}")
            }
            Self::MonthDayWithWeekly => write!(f, "BYMONTHDAY is not allowed with FREQ=WEEKLY"),
            Self::ZeroInterval => write!(f, "INTERVAL must be positive"),
            Self::ZeroCount => write!(f, "COUNT must be positive"),
            Self::OutOfRange { part, value } => write!(f, "{part} value {value} is out of range"),
            Self::Malformed { part, value } => write!(f, "{part} value '{value}' is malformed"),
            Self::DuplicatePart(part) => write!(f, "{part} appears more than once"),
        }
    }
}

/// A rule violated a construction-time constraint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid recurrence rule: {constraint}")]
pub struct RuleValidationError {
    pub constraint: RuleConstraint,
}

impl From<RuleConstraint> for RuleValidationError {
    fn from(constraint: RuleConstraint) -> Self {
        Self { constraint }
    }
}

/// Errors from building a [`RecurrenceRule`] out of text or decoded input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error(transparent)]
    Validation(#[from] RuleValidationError),

    #[error("Unsupported recurrence rule key: {0}")]
    UnsupportedRuleKey(String),
}

impl From<RuleConstraint> for RuleError {
    fn from(constraint: RuleConstraint) -> Self {
        Self::Validation(constraint.into())
    }
}

/// An immutable, validated recurrence rule.
///
/// BY-part lists are sorted and free of duplicates, so two rules that mean the
/// same thing compare equal and print the same.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    parts: RRule,
    freq: Frequency,
}

fn check_range<T>(
    part: &'static str,
    values: &[T],
    range: std::ops::RangeInclusive<i64>,
    allow_zero: bool,
) -> Result<(), RuleConstraint>
where
    T: Copy + Into<i64>,
{
    for &v in values {
        let value: i64 = v.into();
        if !range.contains(&value) || (!allow_zero && value == 0) {
            return Err(RuleConstraint::OutOfRange { part, value });
        }
    }
    Ok(())
}

fn normalize<T: Ord>(values: &mut Vec<T>) {
    values.sort_unstable();
    values.dedup();
}

impl RecurrenceRule {
    /// ## Summary
    /// Validates decoded rule parts.
    ///
    /// ## Errors
    /// Returns `RuleValidationError` naming the first constraint the parts violate.
    pub fn new(mut parts: RRule) -> Result<Self, RuleValidationError> {
        let freq = parts.freq.ok_or(RuleConstraint::MissingFrequency)?;

        if parts.interval == Some(0) {
            return Err(RuleConstraint::ZeroInterval.into());
        }
        if parts.count == Some(0) {
            return Err(RuleConstraint::ZeroCount.into());
        }
        if parts.count.is_some() && parts.until.is_some() {
            return Err(RuleConstraint::CountWithUntil.into());
        }

        check_range("BYSECOND", &parts.by_second, 0..=60, true)?;
        check_range("BYMINUTE", &parts.by_minute, 0..=59, true)?;
        check_range("BYHOUR", &parts.by_hour, 0..=23, true)?;
        check_range("BYMONTHDAY", &parts.by_monthday, -31..=31, false)?;
        check_range("BYYEARDAY", &parts.by_yearday, -366..=366, false)?;
        check_range("BYWEEKNO", &parts.by_weekno, -53..=53, false)?;
        check_range("BYMONTH", &parts.by_month, 1..=12, false)?;
        check_range("BYSETPOS", &parts.by_setpos, -366..=366, false)?;
        let ordinals: Vec<i8> = parts.by_day.iter().filter_map(|d| d.ordinal).collect();
        check_range("BYDAY", &ordinals, -53..=53, false)?;

        if !parts.by_weekno.is_empty() && freq != Frequency::Yearly {
            return Err(RuleConstraint::WeekNoRequiresYearly.into());
        }
        if !parts.by_yearday.is_empty()
            && matches!(
                freq,
                Frequency::Daily | Frequency::Weekly | Frequency::Monthly
            )
        {
            return Err(RuleConstraint::YearDayWithFrequency(freq).into());
        }
        if !parts.by_monthday.is_empty() && freq == Frequency::Weekly {
            return Err(RuleConstraint::MonthDayWithWeekly.into());
        }

        normalize(&mut parts.by_second);
        normalize(&mut parts.by_minute);
        normalize(&mut parts.by_hour);
        normalize(&mut parts.by_monthday);
        normalize(&mut parts.by_yearday);
        normalize(&mut parts.by_weekno);
        normalize(&mut parts.by_month);
        normalize(&mut parts.by_setpos);
        let mut by_day: Vec<WeekdayNum> = Vec::with_capacity(parts.by_day.len());
        for day in parts.by_day.drain(..) {
            if !by_day.contains(&day) {
                by_day.push(day);
            }
        }
        parts.by_day = by_day;

        Ok(Self { parts, freq })
    }

    /// ## Summary
    /// Parses and validates RECUR text such as `FREQ=WEEKLY;BYDAY=MO,WE`.
    ///
    /// ## Errors
    /// Returns `UnsupportedRuleKey` for unknown parts and `Validation` otherwise.
    pub fn parse(text: &str) -> Result<Self, RuleError> {
        let parts = crate::rfc::ical::parse::parse_rrule(text)?;
        Ok(Self::new(parts)?)
    }

    /// ## Summary
    /// Builds a rule from an already decoded mapping (jCal `recur` object).
    ///
    /// ## Errors
    /// Same as [`RecurrenceRule::parse`].
    pub fn from_map(map: &serde_json::Map<String, serde_json::Value>) -> Result<Self, RuleError> {
        let parts = crate::rfc::ical::parse::parse_rrule_map(map)?;
        Ok(Self::new(parts)?)
    }

    #[must_use]
    pub const fn frequency(&self) -> Frequency {
        self.freq
    }

    #[must_use]
    pub fn interval(&self) -> u32 {
        self.parts.interval.unwrap_or(1)
    }

    #[must_use]
    pub const fn count(&self) -> Option<u32> {
        self.parts.count
    }

    #[must_use]
    pub const fn until(&self) -> Option<&RRuleUntil> {
        self.parts.until.as_ref()
    }

    #[must_use]
    pub fn week_start(&self) -> Weekday {
        self.parts.wkst.unwrap_or(Weekday::Monday)
    }

    /// True iff neither COUNT nor UNTIL bounds the rule.
    #[must_use]
    pub const fn is_infinite(&self) -> bool {
        self.parts.count.is_none() && self.parts.until.is_none()
    }

    #[must_use]
    pub fn by_second(&self) -> &[u8] {
        &self.parts.by_second
    }

    #[must_use]
    pub fn by_minute(&self) -> &[u8] {
        &self.parts.by_minute
    }

    #[must_use]
    pub fn by_hour(&self) -> &[u8] {
        &self.parts.by_hour
    }

    #[must_use]
    pub fn by_day(&self) -> &[WeekdayNum] {
        &self.parts.by_day
    }

    #[must_use]
    pub fn by_monthday(&self) -> &[i8] {
        &self.parts.by_monthday
    }

    #[must_use]
    pub fn by_yearday(&self) -> &[i16] {
        &self.parts.by_yearday
    }

    #[must_use]
    pub fn by_weekno(&self) -> &[i8] {
        &self.parts.by_weekno
    }

    #[must_use]
    pub fn by_month(&self) -> &[u8] {
        &self.parts.by_month
    }

    #[must_use]
    pub fn by_setpos(&self) -> &[i16] {
        &self.parts.by_setpos
    }

    /// The normalised parts this rule was built from.
    #[must_use]
    pub const fn parts(&self) -> &RRule {
        &self.parts
    }
}

impl TryFrom<RRule> for RecurrenceRule {
    type Error = RuleValidationError;

    fn try_from(parts: RRule) -> Result<Self, Self::Error> {
        Self::new(parts)
    }
}

impl FromStr for RecurrenceRule {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts)
    }
}
