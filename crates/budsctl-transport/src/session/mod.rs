//! Link driver shared by every transport.
//!
//! A send walks one state machine regardless of the wire mechanism:
//!
//! ```text
//! Idle -> Connecting -> Connected -> Sending -> AwaitingResponse | Done -> Closed
//! ```
//!
//! Any step may fail, and every failure passes through `Closed` before the
//! error reaches the caller. [`exchange`] owns the link for the duration of
//! one send and closes it explicitly on the happy path; a drop guard closes
//! it on every other path, including panics in the link implementation.

use std::fmt;

use tracing::debug;

use crate::error::TransportError;

const SESSION_TARGET: &str = "budsctl_transport::session";

/// Phase of a single send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    /// Resources allocated, nothing attempted yet.
    Idle,
    /// Establishing the link.
    Connecting,
    /// Link established.
    Connected,
    /// Writing the payload.
    Sending,
    /// Waiting for a response.
    AwaitingResponse,
    /// Payload written, no response expected.
    Done,
    /// Link released.
    Closed,
}

impl LinkState {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Sending => "sending",
            Self::AwaitingResponse => "awaiting_response",
            Self::Done => "done",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One connection-oriented link to a device.
///
/// Implementations own whatever resource backs the link (a socket, a GATT
/// connection). [`Link::close`] must be idempotent; the driver may call it
/// from both the happy path and the drop guard.
pub trait Link {
    /// Establishes the link.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] when the device cannot be reached
    /// within the timeout.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Writes the payload.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Send`] when the write is rejected.
    fn write(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Returns `true` when the driver should wait for a response after
    /// writing.
    fn expects_response(&self) -> bool;

    /// Waits for a response.
    ///
    /// `Ok(None)` means the link reported no data, which is acceptable for
    /// transports where a response is optional.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Timeout`] when a required response does not
    /// arrive, or [`TransportError::Send`] when reading fails.
    fn read_response(&mut self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Releases the link.
    fn close(&mut self);
}

/// Closes the wrapped link when dropped unless already closed.
struct CloseGuard<'a, L: Link> {
    link: L,
    endpoint: &'a str,
    closed: bool,
}

impl<'a, L: Link> CloseGuard<'a, L> {
    const fn new(link: L, endpoint: &'a str) -> Self {
        Self {
            link,
            endpoint,
            closed: false,
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.link.close();
            self.closed = true;
            transition(self.endpoint, LinkState::Closed);
        }
    }
}

impl<L: Link> Drop for CloseGuard<'_, L> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Drives `link` through one send of `payload`.
///
/// `endpoint` labels the link in log output. The link is closed before this
/// function returns, whatever the outcome.
///
/// # Errors
///
/// Propagates the first [`TransportError`] raised by the link.
pub fn exchange<L: Link>(
    link: L,
    endpoint: &str,
    payload: &[u8],
) -> Result<Option<Vec<u8>>, TransportError> {
    let mut guard = CloseGuard::new(link, endpoint);
    transition(endpoint, LinkState::Idle);
    let outcome = drive(&mut guard, payload);
    guard.close();
    outcome
}

fn drive<L: Link>(
    guard: &mut CloseGuard<'_, L>,
    payload: &[u8],
) -> Result<Option<Vec<u8>>, TransportError> {
    let endpoint = guard.endpoint;
    transition(endpoint, LinkState::Connecting);
    guard.link.connect()?;
    transition(endpoint, LinkState::Connected);

    transition(endpoint, LinkState::Sending);
    guard.link.write(payload)?;
    debug!(target: SESSION_TARGET, endpoint, bytes = payload.len(), "payload written");

    if !guard.link.expects_response() {
        transition(endpoint, LinkState::Done);
        return Ok(None);
    }
    transition(endpoint, LinkState::AwaitingResponse);
    let response = guard.link.read_response()?;
    debug!(
        target: SESSION_TARGET,
        endpoint,
        bytes = response.as_ref().map_or(0, Vec::len),
        "response received"
    );
    Ok(response)
}

fn transition(endpoint: &str, state: LinkState) {
    debug!(target: SESSION_TARGET, endpoint, state = state.as_str(), "link state");
}
