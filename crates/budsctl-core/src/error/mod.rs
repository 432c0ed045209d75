//! Errors surfaced by the `budsctl` core.
//!
//! Each stage has its own `thiserror` enum carrying the context an operator
//! needs to act (ids, hints, candidate lists, available labels). [`Error`]
//! wraps them all and [`Error::kind`] maps every failure onto one of the
//! eight [`ErrorKind`]s.

use std::fmt;

use budsctl_plugins::{PluginError, PluginErrorKind};
use budsctl_transport::{TransportError, TransportErrorKind};
use thiserror::Error;

use crate::device::MacAddress;

/// Classification of every failure the core can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A plugin document could not be read or parsed, or a requested plugin
    /// does not exist.
    PluginLoad,
    /// A plugin document broke the schema or a semantic rule.
    PluginValidation,
    /// Device discovery failed.
    DeviceDiscovery,
    /// Zero or several targets were resolved.
    DeviceSelection,
    /// A feature or value label is unknown.
    FeatureResolution,
    /// The transport could not establish a link.
    TransportConnect,
    /// The transport failed while writing or reading.
    TransportSend,
    /// The device did not answer in time.
    TransportTimeout,
}

impl ErrorKind {
    /// Returns a stable name for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PluginLoad => "plugin_load",
            Self::PluginValidation => "plugin_validation",
            Self::DeviceDiscovery => "device_discovery",
            Self::DeviceSelection => "device_selection",
            Self::FeatureResolution => "feature_resolution",
            Self::TransportConnect => "transport_connect",
            Self::TransportSend => "transport_send",
            Self::TransportTimeout => "transport_timeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(device, plugin)` pair listed in an ambiguity report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSummary {
    /// Device address.
    pub mac: MacAddress,
    /// Device name, if known.
    pub name: Option<String>,
    /// Id of the matching plugin.
    pub plugin_id: String,
}

impl fmt::Display for CandidateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mac)?;
        if let Some(name) = &self.name {
            write!(f, " ({name})")?;
        }
        write!(f, " via plugin '{}'", self.plugin_id)
    }
}

fn join<T: fmt::Display>(items: &[T], separator: &str) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

/// The resolver could not settle on exactly one target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Discovery returned no devices at all.
    #[error("no Bluetooth devices found; ensure the target device is connected")]
    NoDevices,

    /// A device hint matched no device and no plugin.
    #[error("no device found matching '{hint}'")]
    NoDeviceMatchingHint {
        /// Hint as supplied.
        hint: String,
    },

    /// No discovered device matched the requested plugin.
    #[error("no connected device matched plugin '{plugin_id}'")]
    NoDeviceForPlugin {
        /// Requested plugin id.
        plugin_id: String,
    },

    /// No discovered device matched any loaded plugin.
    #[error(
        "no connected device matched any plugin; name a plugin explicitly or add a plugin document"
    )]
    NoMatchingDevice,

    /// Several targets matched equally well.
    #[error(
        "multiple candidate targets found: {}; narrow the selection with a device hint",
        join(.candidates, ", ")
    )]
    Ambiguous {
        /// Every matching pair, in device-then-plugin order.
        candidates: Vec<CandidateSummary>,
    },
}

/// A feature or value label could not be resolved within a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    /// The plugin does not define the feature.
    #[error(
        "plugin '{plugin_id}' does not define feature '{feature}'; available: {}",
        .available.join(", ")
    )]
    UnknownFeature {
        /// Plugin searched.
        plugin_id: String,
        /// Requested feature.
        feature: String,
        /// Features the plugin does define, sorted.
        available: Vec<String>,
    },

    /// The feature does not define the value label.
    #[error(
        "feature '{feature}' does not support value '{value}'; allowed: {}",
        .allowed.join(", ")
    )]
    UnsupportedValue {
        /// Feature searched.
        feature: String,
        /// Requested label.
        value: String,
        /// Labels the feature does define, sorted.
        allowed: Vec<String>,
    },
}

/// Device discovery failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// Every discovery command failed and no device was found.
    #[error(
        "Bluetooth discovery failed; ensure a working D-Bus/BlueZ session. Details: {}",
        .details.join(" | ")
    )]
    CommandsFailed {
        /// One entry per failed command: the command line and its stderr.
        details: Vec<String>,
    },
}

/// Any failure reported by the core.
#[derive(Debug, Error)]
pub enum Error {
    /// A plugin document failed to load or validate.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// An explicitly requested plugin id is not loaded.
    #[error("unknown plugin '{id}'; list the loaded plugins to pick one")]
    PluginNotFound {
        /// Requested id.
        id: String,
    },

    /// Device discovery failed.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Target resolution failed.
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// Feature resolution failed.
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// The transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    /// Returns the failure classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Plugin(error) => match error.kind() {
                PluginErrorKind::Load => ErrorKind::PluginLoad,
                PluginErrorKind::Validation => ErrorKind::PluginValidation,
            },
            Self::PluginNotFound { .. } => ErrorKind::PluginLoad,
            Self::Discovery(_) => ErrorKind::DeviceDiscovery,
            Self::Selection(_) => ErrorKind::DeviceSelection,
            Self::Feature(_) => ErrorKind::FeatureResolution,
            Self::Transport(error) => match error.kind() {
                TransportErrorKind::Connect => ErrorKind::TransportConnect,
                TransportErrorKind::Send => ErrorKind::TransportSend,
                TransportErrorKind::Timeout => ErrorKind::TransportTimeout,
            },
        }
    }
}

#[cfg(test)]
mod tests;
