//! Plugin documents shipped with the crate.

use crate::source::PluginSource;

const ONEPLUS_BUDS4: &str = include_str!("../builtin/oneplus_buds4.yaml");

/// Returns the built-in plugin sources in file-name order.
#[must_use]
pub fn builtin_sources() -> Vec<PluginSource> {
    vec![PluginSource::new(
        "builtin:oneplus_buds4.yaml",
        ONEPLUS_BUDS4,
    )]
}
