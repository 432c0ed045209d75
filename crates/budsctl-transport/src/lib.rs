//! Wire transports for `budsctl`.
//!
//! A [`Transport`] delivers one payload to one device and optionally returns
//! the device's response. Two implementations ship here:
//!
//! - [`RfcommTransport`] opens an RFCOMM socket on a fixed channel.
//! - [`GattTransport`] writes a BLE GATT characteristic and can wait for a
//!   notification in reply. The BlueZ-backed connector needs the `ble`
//!   feature.
//!
//! Both drive their connection through [`session::exchange`], which walks
//! the `Idle -> Connecting -> Connected -> Sending -> AwaitingResponse | Done
//! -> Closed` state machine and releases the link on every exit path.
//! Connections come from connector traits ([`RfcommConnector`],
//! [`GattConnector`]) so hosts and tests can substitute their own.
//!
//! Nothing in this crate retries. A caller wanting retry-on-timeout wraps
//! [`Transport::send`] itself.

pub mod error;
pub mod gatt;
pub mod rfcomm;
pub mod session;

pub use self::error::{TransportError, TransportErrorKind};
pub use self::gatt::{GattConnector, GattTransport};
pub use self::rfcomm::{RfcommConnector, RfcommTransport};
pub use self::session::{Link, LinkState};

/// Sends a payload to a device over one wire mechanism.
///
/// `Config` carries the addressing and timeout for the mechanism: an RFCOMM
/// channel or a GATT service and characteristics. Each call owns its link
/// exclusively; implementations must not share a link between calls.
pub trait Transport {
    /// Addressing and timeout for this mechanism.
    type Config;

    /// Delivers `payload` to the device at `mac` and returns its response,
    /// if any.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] when the link cannot be
    /// established, [`TransportError::Send`] when the write or read fails,
    /// and [`TransportError::Timeout`] when a required response does not
    /// arrive in time.
    fn send(
        &self,
        mac: &str,
        payload: &[u8],
        config: &Self::Config,
    ) -> Result<Option<Vec<u8>>, TransportError>;

    /// Describes why this transport cannot work in the current build or on
    /// the current platform, if it cannot.
    fn unavailable_reason(&self) -> Option<&'static str> {
        None
    }
}
