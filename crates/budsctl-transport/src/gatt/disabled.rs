//! Stand-in connector used when the `ble` feature is off or the platform
//! has no `BlueZ`.

use budsctl_plugins::BleConfig;

use super::{GattConnector, endpoint};
use crate::error::TransportError;
use crate::session::Link;

const UNAVAILABLE: &str = "BLE GATT support is not compiled in; rebuild with the `ble` feature on Linux";

/// Connector that always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct BluezConnector;

/// Link type that can never be constructed.
#[derive(Debug)]
pub enum DisabledLink {}

impl GattConnector for BluezConnector {
    type Link = DisabledLink;

    fn open(&self, mac: &str, config: &BleConfig) -> Result<DisabledLink, TransportError> {
        Err(TransportError::connect(mac, &endpoint(config), UNAVAILABLE))
    }

    fn unavailable_reason(&self) -> Option<&'static str> {
        Some(UNAVAILABLE)
    }
}

impl Link for DisabledLink {
    fn connect(&mut self) -> Result<(), TransportError> {
        match *self {}
    }

    fn write(&mut self, _payload: &[u8]) -> Result<(), TransportError> {
        match *self {}
    }

    fn expects_response(&self) -> bool {
        match *self {}
    }

    fn read_response(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        match *self {}
    }

    fn close(&mut self) {
        match *self {}
    }
}
