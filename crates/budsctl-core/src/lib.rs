//! Core of `budsctl`: from a feature request to bytes on the wire.
//!
//! A request such as "set `anc` to `on`" flows through four stages:
//!
//! 1. [`discovery`] lists the Bluetooth devices the host knows about.
//! 2. [`matcher`] pairs devices with the plugin documents whose match rules
//!    accept them.
//! 3. [`resolver`] narrows those pairs to exactly one target using the
//!    optional plugin id and device hint, refusing to guess between ties.
//! 4. [`features`] maps the feature and value label onto the payload the
//!    plugin declares, which [`Client::set_feature`] hands to the transport
//!    named by the plugin.
//!
//! [`Client`] ties the stages together over an immutable plugin set loaded
//! once at construction. Every failure is an [`Error`] whose
//! [`Error::kind`] classifies it.

pub mod client;
pub mod device;
pub mod discovery;
pub mod error;
pub mod features;
pub mod matcher;
pub mod resolver;

pub use self::client::{Client, ClientBuilder, SendResult};
pub use self::device::{DetectedDevice, InvalidMacAddress, MacAddress, UNKNOWN_DEVICE_NAME};
pub use self::discovery::{
    BluetoothctlDiscovery, CommandOutput, CommandRunner, Discovery, StaticDiscovery,
    SystemCommandRunner,
};
pub use self::error::{
    CandidateSummary, DiscoveryError, Error, ErrorKind, FeatureError, SelectionError,
};
pub use self::features::FeatureCatalog;
pub use self::matcher::{accepts, best_plugin_for_device, match_candidates};
pub use self::resolver::{ResolvedTarget, TargetQuery, resolve};
