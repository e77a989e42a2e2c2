//! iCalendar (RFC 5545) values and the recurrence expansion engine.

pub mod error;
pub mod rfc;

pub use error::{RfcError, RfcResult};
