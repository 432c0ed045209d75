//! BLE GATT characteristic transport.
//!
//! Each send connects to the device, locates the configured service and
//! write characteristic, subscribes to the notify characteristic when one is
//! configured, writes the payload, then waits for a single notification.
//! Without a notify characteristic the write characteristic is read back on
//! a best-effort basis. The device is disconnected on every exit path.

use budsctl_plugins::BleConfig;
use tracing::debug;

use crate::Transport;
use crate::error::TransportError;
use crate::session::{self, Link};

#[cfg(all(feature = "ble", target_os = "linux"))]
mod bluez;
#[cfg(not(all(feature = "ble", target_os = "linux")))]
mod disabled;

#[cfg(all(feature = "ble", target_os = "linux"))]
pub use self::bluez::{BluezConnector, BluezLink};
#[cfg(not(all(feature = "ble", target_os = "linux")))]
pub use self::disabled::{BluezConnector, DisabledLink};

const GATT_TARGET: &str = "budsctl_transport::gatt";

/// Opens GATT links.
pub trait GattConnector {
    /// Link type produced by this connector.
    type Link: Link;

    /// Prepares a link to `mac` using the configured service and
    /// characteristics.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] when the link cannot be prepared.
    fn open(&self, mac: &str, config: &BleConfig) -> Result<Self::Link, TransportError>;

    /// Describes why links cannot be opened here, if they cannot.
    fn unavailable_reason(&self) -> Option<&'static str> {
        None
    }
}

/// Sends payloads by writing a GATT characteristic.
#[derive(Debug, Clone, Default)]
pub struct GattTransport<C = BluezConnector> {
    connector: C,
}

impl GattTransport {
    /// Creates a transport backed by `BlueZ`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C> GattTransport<C> {
    /// Creates a transport backed by `connector`.
    #[must_use]
    pub const fn with_connector(connector: C) -> Self {
        Self { connector }
    }
}

impl<C: GattConnector> Transport for GattTransport<C> {
    type Config = BleConfig;

    fn send(
        &self,
        mac: &str,
        payload: &[u8],
        config: &BleConfig,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let endpoint = endpoint(config);
        debug!(
            target: GATT_TARGET,
            mac,
            service = %config.service_uuid(),
            write_char = %config.write_char_uuid(),
            notify_char = config.notify_char_uuid().map(ToString::to_string),
            with_response = config.write_with_response(),
            "opening gatt link"
        );
        let link = self.connector.open(mac, config)?;
        session::exchange(link, &endpoint, payload)
    }

    fn unavailable_reason(&self) -> Option<&'static str> {
        self.connector.unavailable_reason()
    }
}

/// Labels a GATT endpoint for messages.
#[must_use]
pub fn endpoint(config: &BleConfig) -> String {
    format!("gatt characteristic {}", config.write_char_uuid())
}
