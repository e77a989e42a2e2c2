//! Explicit date iterator: the anchor merged with an RDATE list.

use chrono::NaiveDateTime;

use super::RecurrenceCursor;
use super::timezone::{TimeZoneResolver, coerce_to_frame};
use crate::rfc::ical::core::DateValue;

/// Ascending cursor over the anchor and a list of explicit dates.
///
/// Values are coerced into the anchor's frame on construction. The anchor is
/// added only when the list does not already hold it; repeats written in the
/// list itself are kept.
#[derive(Debug, Clone)]
pub struct DateListIterator {
    anchor: DateValue,
    values: Vec<NaiveDateTime>,
    position: usize,
}

impl DateListIterator {
    #[must_use]
    pub fn new(anchor: &DateValue, dates: &[DateValue]) -> Self {
        Self::with_resolver(anchor, dates, &mut TimeZoneResolver::new())
    }

    #[must_use]
    pub fn with_resolver(
        anchor: &DateValue,
        dates: &[DateValue],
        resolver: &mut TimeZoneResolver,
    ) -> Self {
        let mut values: Vec<NaiveDateTime> = dates
            .iter()
            .map(|date| coerce_to_frame(date, anchor, resolver).civil())
            .collect();
        let start = anchor.civil();
        if !values.contains(&start) {
            values.push(start);
        }
        values.sort();

        Self {
            anchor: anchor.clone(),
            values,
            position: 0,
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<DateValue> {
        self.current().map(|c| self.anchor.with_civil(c))
    }

    #[must_use]
    pub fn current(&self) -> Option<NaiveDateTime> {
        self.values.get(self.position).copied()
    }

    pub fn advance(&mut self) {
        if self.position < self.values.len() {
            self.position += 1;
        }
    }

    /// Moves to the first value at or after `target`; never moves backwards.
    pub fn seek_to_or_after(&mut self, target: NaiveDateTime) {
        let rest = self.values.get(self.position..).unwrap_or_default();
        self.position += rest.partition_point(|v| *v < target);
    }

    /// Moves to the last value strictly before `target`.
    ///
    /// Returns `false`, leaving the cursor alone, when the current value is
    /// already at or after `target`.
    pub fn seek_to_before(&mut self, target: NaiveDateTime) -> bool {
        if self.current().is_none_or(|c| c >= target) {
            return false;
        }
        let rest = self.values.get(self.position..).unwrap_or_default();
        self.position += rest.partition_point(|v| *v < target) - 1;
        true
    }

    /// Total number of values, including the anchor.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub const fn is_infinite(&self) -> bool {
        false
    }
}

impl Iterator for DateListIterator {
    type Item = DateValue;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.value()?;
        self.advance();
        Some(value)
    }
}

impl RecurrenceCursor for DateListIterator {
    fn current(&self) -> Option<NaiveDateTime> {
        Self::current(self)
    }

    fn advance(&mut self) {
        Self::advance(self);
    }

    fn seek_to_or_after(&mut self, target: NaiveDateTime) {
        Self::seek_to_or_after(self, target);
    }

    fn is_infinite(&self) -> bool {
        false
    }
}
