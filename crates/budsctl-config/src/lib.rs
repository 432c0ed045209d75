//! Layered configuration for `budsctl`.
//!
//! [`Config`] is loaded through `ortho_config`, which merges, from lowest to
//! highest precedence: built-in defaults, a configuration file (selected
//! with `--config-path` or `BUDSCTL_CONFIG_PATH`), `BUDSCTL_*` environment
//! variables, and command-line flags.
//!
//! [`PluginSearchPaths`] derives the ordered list of directories holding
//! user plugin documents from the loaded configuration.

mod defaults;
mod logging;
mod search_paths;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use self::defaults::{
    APP_DIRECTORY, DEFAULT_LOG_FILTER, PLUGIN_DIRECTORY, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use self::logging::{LogFormat, LogFormatParseError};
pub use self::search_paths::PluginSearchPaths;

/// Command-line flags consumed by the configuration loader rather than by
/// subcommands.
pub const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--log-filter",
    "--log-format",
    "--plugin-dir",
];

/// Runtime configuration shared by the CLI and library hosts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "BUDSCTL")]
pub struct Config {
    /// `tracing` filter expression, e.g. `warn` or `budsctl_transport=debug`.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format of diagnostic logs.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Extra plugin directory, searched after the XDG locations.
    #[serde(default)]
    pub plugin_dir: Option<Utf8PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            plugin_dir: None,
        }
    }
}

impl Config {
    /// Returns the configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the configured log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the extra plugin directory, if one is configured.
    #[must_use]
    pub fn plugin_dir(&self) -> Option<&camino::Utf8Path> {
        self.plugin_dir.as_deref()
    }
}
