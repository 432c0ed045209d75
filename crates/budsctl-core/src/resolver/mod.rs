//! Target resolution: from optional hints and a device list to exactly one
//! `(device, plugin)` pair.
//!
//! The algorithm, in order:
//!
//! 1. An explicit plugin id restricts the plugin scope to that plugin, or
//!    fails with [`Error::PluginNotFound`].
//! 2. A device hint is first tried against the devices: it matches when it
//!    equals the address, is a prefix of it (case-insensitive, `-` accepted
//!    for `:`), or is a case-insensitive substring of the name. When no
//!    device matches, the hint is tried against plugin ids and names instead
//!    and, if any match, narrows the plugin scope while every device stays
//!    eligible. Device properties therefore take precedence over plugin
//!    identity when a hint could mean either.
//! 3. The matcher runs over the remaining devices and plugins.
//! 4. Exactly one pair resolves; zero or several fail with a
//!    [`SelectionError`]. The resolver never picks among ties.

use std::fmt;

use budsctl_plugins::{PluginDocument, PluginSet};
use tracing::debug;

use crate::device::DetectedDevice;
use crate::error::{CandidateSummary, Error, SelectionError};
use crate::matcher::match_candidates;

const RESOLVER_TARGET: &str = "budsctl_core::resolver";

/// Optional hints narrowing target resolution.
///
/// # Example
///
/// ```
/// use budsctl_core::TargetQuery;
///
/// let query = TargetQuery::new().with_device_hint("oneplus");
/// assert_eq!(query.device_hint(), Some("oneplus"));
/// assert_eq!(query.plugin_id(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetQuery {
    plugin_id: Option<String>,
    device_hint: Option<String>,
}

impl TargetQuery {
    /// Creates a query with no hints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts resolution to the plugin with this id.
    #[must_use]
    pub fn with_plugin_id(mut self, plugin_id: impl Into<String>) -> Self {
        self.plugin_id = Some(plugin_id.into());
        self
    }

    /// Narrows resolution with a device address, name fragment, or plugin
    /// identity.
    #[must_use]
    pub fn with_device_hint(mut self, device_hint: impl Into<String>) -> Self {
        self.device_hint = Some(device_hint.into());
        self
    }

    /// Returns the requested plugin id, ignoring blank values.
    #[must_use]
    pub fn plugin_id(&self) -> Option<&str> {
        non_blank(self.plugin_id.as_deref())
    }

    /// Returns the device hint, ignoring blank values.
    #[must_use]
    pub fn device_hint(&self) -> Option<&str> {
        non_blank(self.device_hint.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}

/// The device and plugin one command acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget<'p> {
    device: DetectedDevice,
    plugin: &'p PluginDocument,
}

impl<'p> ResolvedTarget<'p> {
    /// Pairs a device with the plugin that drives it.
    #[must_use]
    pub const fn new(device: DetectedDevice, plugin: &'p PluginDocument) -> Self {
        Self { device, plugin }
    }

    /// Returns the target device.
    #[must_use]
    pub const fn device(&self) -> &DetectedDevice {
        &self.device
    }

    /// Returns the plugin driving the device.
    #[must_use]
    pub const fn plugin(&self) -> &'p PluginDocument {
        self.plugin
    }

    fn summary(&self) -> CandidateSummary {
        CandidateSummary {
            mac: self.device.mac(),
            name: self.device.name().map(str::to_owned),
            plugin_id: self.plugin.id().to_owned(),
        }
    }
}

impl fmt::Display for ResolvedTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} via plugin '{}'", self.device, self.plugin.id())
    }
}

/// Resolves `query` against `devices` and `plugins` to exactly one target.
///
/// # Errors
///
/// Returns [`Error::PluginNotFound`] when the query names an unknown plugin
/// and [`Error::Selection`] when zero or several targets match.
pub fn resolve<'p>(
    plugins: &'p PluginSet,
    query: &TargetQuery,
    devices: &[DetectedDevice],
) -> Result<ResolvedTarget<'p>, Error> {
    let mut scope: Vec<&PluginDocument> = match query.plugin_id() {
        Some(id) => vec![plugins.get(id).ok_or_else(|| Error::PluginNotFound {
            id: id.to_owned(),
        })?],
        None => plugins.iter().collect(),
    };

    if devices.is_empty() {
        return Err(SelectionError::NoDevices.into());
    }

    let mut eligible: Vec<DetectedDevice> = devices.to_vec();
    if let Some(hint) = query.device_hint() {
        let hinted: Vec<DetectedDevice> = devices
            .iter()
            .filter(|device| device_matches_hint(device, hint))
            .cloned()
            .collect();
        if hinted.is_empty() {
            scope.retain(|plugin| plugin_matches_hint(plugin, hint));
            if scope.is_empty() {
                return Err(SelectionError::NoDeviceMatchingHint {
                    hint: hint.to_owned(),
                }
                .into());
            }
            debug!(target: RESOLVER_TARGET, hint, plugins = scope.len(), "hint names a plugin");
        } else {
            debug!(target: RESOLVER_TARGET, hint, devices = hinted.len(), "hint names a device");
            eligible = hinted;
        }
    }

    let mut candidates = match_candidates(&eligible, &scope);
    debug!(
        target: RESOLVER_TARGET,
        devices = eligible.len(),
        plugins = scope.len(),
        candidates = candidates.len(),
        "matched candidates"
    );

    if candidates.len() > 1 {
        return Err(SelectionError::Ambiguous {
            candidates: candidates.iter().map(ResolvedTarget::summary).collect(),
        }
        .into());
    }
    candidates.pop().ok_or_else(|| no_match(query).into())
}

fn no_match(query: &TargetQuery) -> SelectionError {
    if let Some(hint) = query.device_hint() {
        return SelectionError::NoDeviceMatchingHint {
            hint: hint.to_owned(),
        };
    }
    query
        .plugin_id()
        .map_or(SelectionError::NoMatchingDevice, |plugin_id| {
            SelectionError::NoDeviceForPlugin {
                plugin_id: plugin_id.to_owned(),
            }
        })
}

fn device_matches_hint(device: &DetectedDevice, hint: &str) -> bool {
    let mac_hint = hint.to_ascii_uppercase().replace('-', ":");
    let mac = device.mac().to_string();
    if mac.starts_with(&mac_hint) {
        return true;
    }
    device
        .name()
        .is_some_and(|name| name.to_lowercase().contains(&hint.to_lowercase()))
}

fn plugin_matches_hint(plugin: &PluginDocument, hint: &str) -> bool {
    let lowered = hint.to_lowercase();
    plugin.id().to_lowercase().contains(&lowered) || plugin.name().to_lowercase().contains(&lowered)
}
