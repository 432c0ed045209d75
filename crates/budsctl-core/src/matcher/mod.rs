//! Device-to-plugin matching.
//!
//! A plugin accepts a device when any `name_contains` entry is a
//! case-insensitive substring of the device name, or any `mac_prefix` entry
//! is a prefix of the device address. There is no scoring: the matcher
//! reports every accepted pair and leaves disambiguation to
//! [`crate::resolver`].

use budsctl_plugins::{MatchRules, PluginDocument, PluginSet};

use crate::device::DetectedDevice;
use crate::resolver::ResolvedTarget;

/// Returns whether `rules` accept `device`.
#[must_use]
pub fn accepts(rules: &MatchRules, device: &DetectedDevice) -> bool {
    let by_name = device.name().is_some_and(|name| {
        let lowered = name.to_lowercase();
        rules
            .name_contains()
            .iter()
            .any(|pattern| lowered.contains(&pattern.to_lowercase()))
    });
    by_name || {
        let mac = device.mac().to_string();
        rules
            .mac_prefix()
            .iter()
            .any(|prefix| mac.starts_with(prefix.as_str()))
    }
}

/// Lists every accepted `(device, plugin)` pair.
///
/// Pairs are ordered by device (input order), then by plugin (input order),
/// so identical inputs always yield the identical sequence.
#[must_use]
pub fn match_candidates<'p>(
    devices: &[DetectedDevice],
    plugins: &[&'p PluginDocument],
) -> Vec<ResolvedTarget<'p>> {
    devices
        .iter()
        .flat_map(|device| {
            plugins
                .iter()
                .copied()
                .filter(|plugin| accepts(plugin.match_rules(), device))
                .map(|plugin| ResolvedTarget::new(device.clone(), plugin))
        })
        .collect()
}

/// Returns the first plugin, in id order, that accepts `device`.
///
/// Used to annotate device listings; target resolution never relies on it.
#[must_use]
pub fn best_plugin_for_device<'p>(
    device: &DetectedDevice,
    plugins: &'p PluginSet,
) -> Option<&'p PluginDocument> {
    plugins
        .iter()
        .find(|plugin| accepts(plugin.match_rules(), device))
}
