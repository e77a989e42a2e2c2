//! iCalendar recurrence: value types, value parsers and expansion.

pub mod core;
pub mod expand;
pub mod parse;

#[cfg(test)]
mod tests;
