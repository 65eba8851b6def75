//! Layered settings for the command line front end.
//!
//! Values come from, in increasing priority: built-in defaults, a
//! `schedule-lens.toml` file, and `SCHEDULE_LENS_` environment variables.
//! A double underscore separates nesting levels:
//!
//! ```bash
//! SCHEDULE_LENS_COMPARE__JOIN=inner
//! SCHEDULE_LENS_LOGGING__DEFAULT=debug
//! ```
//!
//! ```toml
//! [compare]
//! join = "left"
//! natural_key = ["task_code", "task_name", "task_type"]
//!
//! [display]
//! max_rows = 50
//!
//! [logging]
//! default = "warn"
//!
//! [logging.modules]
//! schedule_lens = "debug"
//! ```

use crate::compare::{DEFAULT_NATURAL_KEY, JoinMode};
use crate::error::{ScheduleError, ScheduleResult};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "schedule-lens.toml";
pub const ENV_PREFIX: &str = "SCHEDULE_LENS_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub compare: CompareConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareConfig {
    #[serde(default)]
    pub join: JoinMode,
    #[serde(default = "default_natural_key")]
    pub natural_key: Vec<String>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            join: JoinMode::default(),
            natural_key: default_natural_key(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Rows printed before the table is truncated.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_rows: default_max_rows(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level for everything without a module override.
    #[serde(default = "default_log_level")]
    pub default: String,
    /// Per-target overrides, e.g. `schedule_lens::compare = "debug"`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

fn default_natural_key() -> Vec<String> {
    DEFAULT_NATURAL_KEY.iter().map(|f| f.to_string()).collect()
}
fn default_max_rows() -> usize { 50 }
fn default_log_level() -> String { "warn".to_string() }

impl Settings {
    /// Load from `schedule-lens.toml` in the working directory, if present.
    pub fn load() -> ScheduleResult<Self> {
        Self::load_from(CONFIG_FILE_NAME)
    }

    /// Load from a specific file. A missing file leaves the defaults in place.
    pub fn load_from(path: impl AsRef<Path>) -> ScheduleResult<Self> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
            )
            .extract()
            .map_err(ScheduleError::from)
    }
}
