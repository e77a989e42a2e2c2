/// Last civil year the recurrence engine will expand into.
///
/// Rules whose BY-parts can never be satisfied stop here instead of
/// searching forever.
pub const MAX_EXPANSION_YEAR: i32 = 9999;

/// Default cap on occurrences collected by a bounded expansion.
pub const DEFAULT_MAX_INSTANCES: usize = 1000;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "KALENDAE";

/// Optional configuration file, looked up relative to the working directory.
pub const CONFIG_FILE: &str = "kalendae.toml";

/// Log filter used when the configured one is missing or invalid.
pub const DEFAULT_LOG_LEVEL: &str = "info";
