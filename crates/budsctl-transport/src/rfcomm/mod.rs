//! RFCOMM socket transport.

use budsctl_plugins::RfcommConfig;
use tracing::debug;

use crate::Transport;
use crate::error::TransportError;
use crate::session::{self, Link};

#[cfg(target_os = "linux")]
mod socket;
#[cfg(not(target_os = "linux"))]
mod unsupported;

#[cfg(target_os = "linux")]
pub use self::socket::{RfcommSocket, SocketConnector};
#[cfg(not(target_os = "linux"))]
pub use self::unsupported::{SocketConnector, UnsupportedLink};

const RFCOMM_TARGET: &str = "budsctl_transport::rfcomm";

/// Opens RFCOMM links.
///
/// Opening allocates the link's resources without connecting it;
/// [`Link::connect`] performs the connect bounded by the configured timeout.
pub trait RfcommConnector {
    /// Link type produced by this connector.
    type Link: Link;

    /// Allocates a link to `mac` on the configured channel.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] when the link cannot be
    /// allocated (bad address, no Bluetooth support).
    fn open(&self, mac: &str, config: &RfcommConfig) -> Result<Self::Link, TransportError>;

    /// Describes why links cannot be opened here, if they cannot.
    fn unavailable_reason(&self) -> Option<&'static str> {
        None
    }
}

/// Sends payloads over RFCOMM.
///
/// After writing, the transport waits up to the configured timeout for one
/// read of up to 1024 bytes. A read timeout or end-of-stream yields no
/// response; a response is optional over RFCOMM.
#[derive(Debug, Clone, Default)]
pub struct RfcommTransport<C = SocketConnector> {
    connector: C,
}

impl RfcommTransport {
    /// Creates a transport backed by real sockets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C> RfcommTransport<C> {
    /// Creates a transport backed by `connector`.
    #[must_use]
    pub const fn with_connector(connector: C) -> Self {
        Self { connector }
    }

    /// Returns the connector.
    #[must_use]
    pub const fn connector(&self) -> &C {
        &self.connector
    }
}

impl<C: RfcommConnector> Transport for RfcommTransport<C> {
    type Config = RfcommConfig;

    fn send(
        &self,
        mac: &str,
        payload: &[u8],
        config: &RfcommConfig,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let endpoint = endpoint(config);
        debug!(
            target: RFCOMM_TARGET,
            mac,
            channel = config.channel(),
            timeout_s = config.timeout().as_secs_f64(),
            "opening rfcomm link"
        );
        let link = self.connector.open(mac, config)?;
        session::exchange(link, &endpoint, payload)
    }

    fn unavailable_reason(&self) -> Option<&'static str> {
        self.connector.unavailable_reason()
    }
}

/// Labels an RFCOMM endpoint for messages.
#[must_use]
pub fn endpoint(config: &RfcommConfig) -> String {
    format!("rfcomm channel {}", config.channel())
}
