//! Directories searched for user plugin documents.

use std::path::{Path, PathBuf};

use crate::Config;
use crate::defaults::{APP_DIRECTORY, PLUGIN_DIRECTORY};

/// Ordered plugin directories, lowest precedence first.
///
/// Later directories win when two documents share an id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginSearchPaths {
    paths: Vec<PathBuf>,
}

impl PluginSearchPaths {
    /// Derives the search paths from the XDG base directories and the
    /// configured `plugin_dir`.
    ///
    /// The order is `$XDG_CONFIG_HOME/budsctl/plugins`,
    /// `$XDG_DATA_HOME/budsctl/plugins`, then `plugin_dir`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::from_bases(
            dirs::config_dir().as_deref(),
            dirs::data_dir().as_deref(),
            config.plugin_dir().map(camino::Utf8Path::as_std_path),
        )
    }

    /// Builds the search paths from explicit base directories.
    #[must_use]
    pub fn from_bases(
        config_home: Option<&Path>,
        data_home: Option<&Path>,
        plugin_dir: Option<&Path>,
    ) -> Self {
        let paths = [config_home, data_home]
            .into_iter()
            .flatten()
            .map(|base| base.join(APP_DIRECTORY).join(PLUGIN_DIRECTORY))
            .chain(plugin_dir.map(Path::to_path_buf))
            .collect();
        Self { paths }
    }

    /// Returns the directories, lowest precedence first.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}
