//! The public query and command surface.
//!
//! A [`Client`] owns the loaded plugin set for its lifetime together with
//! the transports and discovery it dispatches through. Every query discovers
//! devices afresh and resolves a target per call; nothing is cached between
//! calls.

use budsctl_config::{Config, PluginSearchPaths};
use budsctl_plugins::{
    BleConfig, LoadReport, PluginDocument, PluginError, PluginSet, RfcommConfig, TransportConfig,
    TransportKind, builtin_sources, load, read_search_paths, to_hex,
};
use budsctl_transport::{GattTransport, RfcommTransport, Transport};
use tracing::{debug, info, warn};

use crate::device::DetectedDevice;
use crate::discovery::{BluetoothctlDiscovery, Discovery};
use crate::error::Error;
use crate::features::{self, FeatureCatalog};
use crate::resolver::{self, ResolvedTarget, TargetQuery};

const CLIENT_TARGET: &str = "budsctl_core::client";

/// Outcome of a successful [`Client::set_feature`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult<'p> {
    target: ResolvedTarget<'p>,
    feature: String,
    value: String,
    payload: Vec<u8>,
    response: Option<Vec<u8>>,
}

impl<'p> SendResult<'p> {
    /// Returns the target the payload was sent to.
    #[must_use]
    pub const fn target(&self) -> &ResolvedTarget<'p> {
        &self.target
    }

    /// Returns the feature that was set.
    #[must_use]
    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// Returns the value label that was sent.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the bytes written to the device.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the device's response, if one arrived.
    #[must_use]
    pub fn response(&self) -> Option<&[u8]> {
        self.response.as_deref()
    }

    /// Returns the payload as lowercase hex.
    #[must_use]
    pub fn payload_hex(&self) -> String {
        to_hex(&self.payload)
    }

    /// Returns the response as lowercase hex, if one arrived.
    #[must_use]
    pub fn response_hex(&self) -> Option<String> {
        self.response.as_deref().map(to_hex)
    }
}

/// Plugin set, transports, and discovery behind one handle.
///
/// `R` sends RFCOMM payloads, `B` sends GATT payloads, and `D` lists
/// devices. The defaults are the built-in transports and `bluetoothctl`
/// discovery; hosts and tests substitute their own through
/// [`ClientBuilder`].
///
/// # Example
///
/// ```
/// use budsctl_core::{Client, DetectedDevice, StaticDiscovery, TargetQuery};
///
/// let device = DetectedDevice::named(
///     "88:92:CC:11:22:33".parse().expect("valid address"),
///     "OnePlus Buds 4",
/// );
/// let client = Client::builder()
///     .discovery(StaticDiscovery::new(vec![device]))
///     .build();
///
/// let query = TargetQuery::new().with_device_hint("oneplus");
/// let catalog = client.feature_catalog(&query).expect("target resolves");
/// assert_eq!(catalog.target().plugin().id(), "oneplus_buds4");
/// assert!(catalog.features().contains_key("anc"));
/// ```
#[derive(Debug)]
pub struct Client<R = RfcommTransport, B = GattTransport, D = BluetoothctlDiscovery> {
    plugins: PluginSet,
    load_warnings: Vec<String>,
    load_errors: Vec<PluginError>,
    runtime_warnings: Vec<String>,
    rfcomm: R,
    ble: B,
    discovery: D,
}

impl Client {
    /// Starts a builder with the built-in plugins, transports, and discovery.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Loads the built-in plugins and the user search paths derived from
    /// `config`, with the default transports and discovery.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let search_paths = PluginSearchPaths::from_config(config);
        debug!(
            target: CLIENT_TARGET,
            paths = ?search_paths.paths(),
            "loading plugins"
        );
        let report = load(&builtin_sources(), &read_search_paths(search_paths.paths()));
        Self::builder().plugins(report).build()
    }
}

impl<R, B, D> Client<R, B, D> {
    /// Returns the loaded plugin set.
    #[must_use]
    pub const fn plugins(&self) -> &PluginSet {
        &self.plugins
    }

    /// Lists loaded plugins sorted by id.
    #[must_use]
    pub fn list_plugins(&self) -> Vec<&PluginDocument> {
        self.plugins.iter().collect()
    }

    /// Returns override notices and skipped-document summaries from loading.
    #[must_use]
    pub fn load_warnings(&self) -> &[String] {
        &self.load_warnings
    }

    /// Returns one error per plugin document skipped during loading.
    #[must_use]
    pub fn load_errors(&self) -> &[PluginError] {
        &self.load_errors
    }

    /// Returns transport capabilities missing from this build or platform.
    #[must_use]
    pub fn runtime_warnings(&self) -> &[String] {
        &self.runtime_warnings
    }
}

impl<R, B, D: Discovery> Client<R, B, D> {
    /// Lists discovered devices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`] when discovery fails.
    pub fn list_devices(&self) -> Result<Vec<DetectedDevice>, Error> {
        let devices = self.discovery.discover()?;
        debug!(target: CLIENT_TARGET, devices = devices.len(), "discovered devices");
        Ok(devices)
    }

    /// Discovers devices and resolves `query` to exactly one target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`], [`Error::PluginNotFound`], or
    /// [`Error::Selection`].
    pub fn resolve_target(&self, query: &TargetQuery) -> Result<ResolvedTarget<'_>, Error> {
        let devices = self.list_devices()?;
        resolver::resolve(&self.plugins, query, &devices)
    }

    /// Resolves a target and lists the value labels of `feature`.
    ///
    /// # Errors
    ///
    /// Returns any [`Client::resolve_target`] error, or [`Error::Feature`]
    /// when the target's plugin lacks the feature.
    pub fn feature_values(
        &self,
        feature: &str,
        query: &TargetQuery,
    ) -> Result<(ResolvedTarget<'_>, Vec<String>), Error> {
        let target = self.resolve_target(query)?;
        let values = features::values(target.plugin(), feature)?;
        Ok((target, values))
    }

    /// Resolves a target and lists all its features and value labels.
    ///
    /// # Errors
    ///
    /// Returns any [`Client::resolve_target`] error.
    pub fn feature_catalog(&self, query: &TargetQuery) -> Result<FeatureCatalog<'_>, Error> {
        self.resolve_target(query).map(FeatureCatalog::for_target)
    }
}

impl<R, B, D> Client<R, B, D>
where
    R: Transport<Config = RfcommConfig>,
    B: Transport<Config = BleConfig>,
    D: Discovery,
{
    /// Resolves a target and sends the payload for `feature` = `value`.
    ///
    /// The transport is chosen by the plugin's transport type. Nothing is
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns any [`Client::resolve_target`] error, [`Error::Feature`] for
    /// an unknown feature or value, and [`Error::Transport`] when sending
    /// fails.
    pub fn set_feature(
        &self,
        feature: &str,
        value: &str,
        query: &TargetQuery,
    ) -> Result<SendResult<'_>, Error> {
        let target = self.resolve_target(query)?;
        let plugin = target.plugin();
        let payload = features::payload(plugin, feature, value)?;
        let mac = target.device().mac().to_string();

        info!(
            target: CLIENT_TARGET,
            mac = %mac,
            plugin = plugin.id(),
            feature,
            value,
            transport = %plugin.transport().kind(),
            bytes = payload.len(),
            "sending feature payload"
        );
        let response = match plugin.transport() {
            TransportConfig::Rfcomm(config) => self.rfcomm.send(&mac, payload.as_bytes(), config),
            TransportConfig::Ble(config) => self.ble.send(&mac, payload.as_bytes(), config),
        }?;

        Ok(SendResult {
            payload: payload.as_bytes().to_vec(),
            target,
            feature: feature.to_owned(),
            value: value.to_owned(),
            response,
        })
    }
}

/// Assembles a [`Client`].
#[derive(Debug)]
pub struct ClientBuilder<R = RfcommTransport, B = GattTransport, D = BluetoothctlDiscovery> {
    report: Option<LoadReport>,
    rfcomm: R,
    ble: B,
    discovery: D,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            report: None,
            rfcomm: RfcommTransport::new(),
            ble: GattTransport::new(),
            discovery: BluetoothctlDiscovery::new(),
        }
    }
}

impl<R, B, D> ClientBuilder<R, B, D> {
    /// Uses an already loaded plugin report instead of the built-in plugins.
    #[must_use]
    pub fn plugins(mut self, report: LoadReport) -> Self {
        self.report = Some(report);
        self
    }

    /// Replaces the RFCOMM transport.
    #[must_use]
    pub fn rfcomm<T>(self, rfcomm: T) -> ClientBuilder<T, B, D> {
        ClientBuilder {
            report: self.report,
            rfcomm,
            ble: self.ble,
            discovery: self.discovery,
        }
    }

    /// Replaces the GATT transport.
    #[must_use]
    pub fn ble<T>(self, ble: T) -> ClientBuilder<R, T, D> {
        ClientBuilder {
            report: self.report,
            rfcomm: self.rfcomm,
            ble,
            discovery: self.discovery,
        }
    }

    /// Replaces device discovery.
    #[must_use]
    pub fn discovery<T>(self, discovery: T) -> ClientBuilder<R, B, T> {
        ClientBuilder {
            report: self.report,
            rfcomm: self.rfcomm,
            ble: self.ble,
            discovery,
        }
    }
}

impl<R, B, D> ClientBuilder<R, B, D>
where
    R: Transport<Config = RfcommConfig>,
    B: Transport<Config = BleConfig>,
{
    /// Builds the client, loading the built-in plugins when no report was
    /// supplied.
    #[must_use]
    pub fn build(self) -> Client<R, B, D> {
        let report = self
            .report
            .unwrap_or_else(|| load(&builtin_sources(), &[]));
        let (plugins, load_warnings, load_errors) = report.into_parts();

        let runtime_warnings: Vec<String> = [
            (TransportKind::Rfcomm, self.rfcomm.unavailable_reason()),
            (TransportKind::Ble, self.ble.unavailable_reason()),
        ]
        .into_iter()
        .filter_map(|(kind, reason)| {
            reason.map(|text| format!("{text}; {kind} plugins cannot be controlled"))
        })
        .collect();
        for message in &runtime_warnings {
            warn!(target: CLIENT_TARGET, "{message}");
        }

        Client {
            plugins,
            load_warnings,
            load_errors,
            runtime_warnings,
            rfcomm: self.rfcomm,
            ble: self.ble,
            discovery: self.discovery,
        }
    }
}

#[cfg(test)]
mod tests;
