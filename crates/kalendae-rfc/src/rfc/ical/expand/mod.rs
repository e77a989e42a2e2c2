//! Recurrence expansion (RFC 5545 §3.8.5).
//!
//! [`RuleIterator`] walks one RRULE, [`DateListIterator`] walks the anchor plus
//! RDATE values, and [`OccurrenceExpander`] merges both with EXDATE and
//! RECURRENCE-ID overrides into the final timeline of a [`RecurrenceSet`].

pub mod calendar;
mod date_iter;
mod expander;
mod options;
mod rule_iter;
pub mod timezone;

use chrono::NaiveDateTime;

pub use date_iter::DateListIterator;
pub use expander::{
    ExpanderState, Occurrence, OccurrenceExpander, OccurrenceKind, Override, RecurrenceSet,
};
pub use options::{ExpansionError, ExpansionOptions};
pub use rule_iter::{OccurrenceIndex, RuleIterator, RuleIteratorState};
pub use timezone::{ConversionError, TimeZoneResolver};

/// Forward-only cursor over wall-clock values in an anchor's frame.
///
/// Implemented by both iterators so the expander can merge them.
pub trait RecurrenceCursor {
    /// Value under the cursor, `None` once exhausted.
    fn current(&self) -> Option<NaiveDateTime>;

    fn advance(&mut self);

    /// Moves to the first value at or after `target`; never moves backwards.
    fn seek_to_or_after(&mut self, target: NaiveDateTime);

    fn is_infinite(&self) -> bool;
}
