use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::constants::{CONFIG_FILE, DEFAULT_LOG_LEVEL, DEFAULT_MAX_INSTANCES, ENV_PREFIX};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub expansion: ExpansionConfig,
    pub logging: LoggingConfig,
}

/// Defaults applied to bounded recurrence expansion.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpansionConfig {
    /// Upper bound on occurrences a bounded expansion collects.
    pub max_instances: usize,
    /// IANA zone used when a floating value has to be placed on the UTC line.
    pub default_timezone: Option<String>,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_instances: DEFAULT_MAX_INSTANCES,
            default_timezone: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Settings {
    /// ## Summary
    /// Loads configuration from defaults, `KALENDAE_*` environment variables and an
    /// optional `kalendae.toml`, in that order of precedence (later wins).
    ///
    /// Nested keys use a double underscore, e.g. `KALENDAE_EXPANSION__MAX_INSTANCES`.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    /// ## Summary
    /// Same as [`Settings::load`] but reads the optional file from `path`.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load_from(path: &str) -> Result<Self> {
        let max_instances = i64::try_from(DEFAULT_MAX_INSTANCES)?;

        Ok(Config::builder()
            .set_default("expansion.max_instances", max_instances)?
            .set_default("logging.level", DEFAULT_LOG_LEVEL)?
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .add_source(config::File::with_name(path).required(false))
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
