//! Parsers for the property values a recurring series is described by.

pub mod error;
mod rrule;
mod values;

pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use rrule::{parse_rrule, parse_rrule_map};
pub use values::{
    parse_date, parse_date_list, parse_date_value, parse_datetime, parse_duration, parse_time,
};
