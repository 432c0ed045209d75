//! Stand-in connector for platforms without `AF_BLUETOOTH` sockets.

use budsctl_plugins::RfcommConfig;

use super::{RfcommConnector, endpoint};
use crate::error::TransportError;
use crate::session::Link;

const UNAVAILABLE: &str = "RFCOMM sockets are only available on Linux";

/// Connector that always fails; RFCOMM sockets are Linux-only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketConnector;

/// Link type that can never be constructed.
#[derive(Debug)]
pub enum UnsupportedLink {}

impl RfcommConnector for SocketConnector {
    type Link = UnsupportedLink;

    fn open(&self, mac: &str, config: &RfcommConfig) -> Result<UnsupportedLink, TransportError> {
        Err(TransportError::connect(mac, &endpoint(config), UNAVAILABLE))
    }

    fn unavailable_reason(&self) -> Option<&'static str> {
        Some(UNAVAILABLE)
    }
}

impl Link for UnsupportedLink {
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
