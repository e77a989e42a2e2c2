//! Shared configuration, logging and error plumbing for the kalendae crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;

pub use error::{CoreError, CoreResult};
