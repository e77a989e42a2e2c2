//! iCalendar value types used by the recurrence engine.

mod datetime;
mod recurrence_rule;
mod rrule;
mod value;

pub use datetime::{DateTime, DateTimeForm};
pub use recurrence_rule::{RecurrenceRule, RuleConstraint, RuleError, RuleValidationError};
pub use rrule::{Frequency, RRule, RRuleUntil, Weekday, WeekdayNum};
pub use value::{DateValue, RecurrenceId};
