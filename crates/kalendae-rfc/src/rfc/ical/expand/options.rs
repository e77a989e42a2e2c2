//! Expansion errors and caller-supplied bounds.

use chrono::{DateTime, Utc};
use kalendae_core::config::ExpansionConfig;
use kalendae_core::constants::DEFAULT_MAX_INSTANCES;

/// Error during recurrence expansion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpansionError {
    /// A terminal seek was requested on a rule without COUNT or UNTIL.
    #[error("Recurrence rule has no COUNT or UNTIL, it never ends")]
    InfiniteRule,

    /// Every occurrence of the series was excluded.
    #[error("Recurrence set has no instances")]
    NoInstances,

    /// The expander must be started before it can be fast-forwarded.
    #[error("Occurrence expander is not positioned")]
    NotPositioned,
}

/// Options for bounded expansion, as used by free/busy style consumers.
#[derive(Debug, Clone)]
pub struct ExpansionOptions {
    /// Maximum number of occurrences to collect.
    pub max_instances: usize,

    /// Start of time range filter (inclusive).
    pub range_start: Option<DateTime<Utc>>,

    /// End of time range filter (exclusive).
    pub range_end: Option<DateTime<Utc>>,

    /// Zone used to place floating times on the UTC line; UTC when unset.
    pub floating_zone: Option<String>,
}

impl Default for ExpansionOptions {
    fn default() -> Self {
        Self {
            max_instances: DEFAULT_MAX_INSTANCES,
            range_start: None,
            range_end: None,
            floating_zone: None,
        }
    }
}

impl ExpansionOptions {
    /// Creates expansion options with a time range.
    #[must_use]
    pub fn with_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            range_start: Some(start),
            range_end: Some(end),
            ..Self::default()
        }
    }

    /// Sets the maximum number of instances.
    #[must_use]
    pub fn with_max_instances(mut self, max: usize) -> Self {
        self.max_instances = max;
        self
    }

    #[must_use]
    pub fn with_floating_zone(mut self, tzid: impl Into<String>) -> Self {
        self.floating_zone = Some(tzid.into());
        self
    }
}

impl From<&ExpansionConfig> for ExpansionOptions {
    fn from(config: &ExpansionConfig) -> Self {
        Self {
            max_instances: config.max_instances,
            floating_zone: config.default_timezone.clone(),
            ..Self::default()
        }
    }
}
