use thiserror::Error;

use crate::rfc::ical::core::{RuleError, RuleValidationError};
use crate::rfc::ical::expand::{ConversionError, ExpansionError};
use crate::rfc::ical::parse::ParseError;

/// Errors raised by the iCalendar layer and the recurrence engine.
#[derive(Error, Debug)]
pub enum RfcError {
    #[error("Value parse error: {0}")]
    ParseError(#[from] ParseError),

    #[error("Recurrence rule error: {0}")]
    RuleError(#[from] RuleError),

    #[error("Recurrence rule validation error: {0}")]
    RuleValidationError(#[from] RuleValidationError),

    #[error("Expansion error: {0}")]
    ExpansionError(#[from] ExpansionError),

    #[error("Timezone conversion error: {0}")]
    ConversionError(#[from] ConversionError),

    #[error(transparent)]
    CoreError(#[from] kalendae_core::error::CoreError),
}

pub type RfcResult<T> = std::result::Result<T, RfcError>;
