//! Process settings read from the environment.

use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use crate::result::NutraResult;

/// Settings that govern the process rather than a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Settings {
    /// Loads settings from `NUTRA_`-prefixed environment variables, using
    /// `__` between nested keys (`NUTRA_LOGGING__LEVEL=debug`).
    pub fn load() -> NutraResult<Self> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("NUTRA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
