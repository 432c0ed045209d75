//! Transport failures.
//!
//! Every variant names the device MAC and the endpoint it was addressed on
//! (`rfcomm channel 15`, `gatt characteristic 2a19`) so messages are
//! actionable without a stack trace.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Which phase of a send failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The link could not be established.
    Connect,
    /// The link was up but the write or read failed.
    Send,
    /// The write succeeded but the expected response never arrived.
    Timeout,
}

/// Errors raised by a [`crate::Transport`].
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The link could not be established within the timeout, or the adapter
    /// rejected it.
    #[error("could not connect to {mac} on {endpoint}: {message}")]
    Connect {
        /// Target device.
        mac: String,
        /// Channel or characteristic being addressed.
        endpoint: String,
        /// What went wrong.
        message: String,
        /// Underlying I/O error, when there is one.
        #[source]
        source: Option<Arc<io::Error>>,
    },

    /// The link was established but writing or reading failed.
    #[error("send to {mac} on {endpoint} failed: {message}")]
    Send {
        /// Target device.
        mac: String,
        /// Channel or characteristic being addressed.
        endpoint: String,
        /// What went wrong.
        message: String,
        /// Underlying I/O error, when there is one.
        #[source]
        source: Option<Arc<io::Error>>,
    },

    /// No response arrived within the timeout.
    #[error("timed out after {:.1}s waiting for a response from {mac} on {endpoint}", timeout.as_secs_f64())]
    Timeout {
        /// Target device.
        mac: String,
        /// Channel or characteristic being addressed.
        endpoint: String,
        /// How long the transport waited.
        timeout: Duration,
    },
}

impl TransportError {
    /// Builds a [`TransportError::Connect`] without an I/O cause.
    #[must_use]
    pub fn connect(mac: &str, endpoint: &str, message: impl Into<String>) -> Self {
        Self::Connect {
            mac: mac.to_owned(),
            endpoint: endpoint.to_owned(),
            message: message.into(),
            source: None,
        }
    }

    /// Builds a [`TransportError::Connect`] from an I/O error.
    #[must_use]
    pub fn connect_io(mac: &str, endpoint: &str, source: io::Error) -> Self {
        Self::Connect {
            mac: mac.to_owned(),
            endpoint: endpoint.to_owned(),
            message: source.to_string(),
            source: Some(Arc::new(source)),
        }
    }

    /// Builds a [`TransportError::Send`] without an I/O cause.
    #[must_use]
    pub fn send(mac: &str, endpoint: &str, message: impl Into<String>) -> Self {
        Self::Send {
            mac: mac.to_owned(),
            endpoint: endpoint.to_owned(),
            message: message.into(),
            source: None,
        }
    }

    /// Builds a [`TransportError::Send`] from an I/O error.
    #[must_use]
    pub fn send_io(mac: &str, endpoint: &str, source: io::Error) -> Self {
        Self::Send {
            mac: mac.to_owned(),
            endpoint: endpoint.to_owned(),
            message: source.to_string(),
            source: Some(Arc::new(source)),
        }
    }

    /// Builds a [`TransportError::Timeout`].
    #[must_use]
    pub fn timeout(mac: &str, endpoint: &str, timeout: Duration) -> Self {
        Self::Timeout {
            mac: mac.to_owned(),
            endpoint: endpoint.to_owned(),
            timeout,
        }
    }

    /// Returns the failed phase.
    #[must_use]
    pub const fn kind(&self) -> TransportErrorKind {
        match self {
            Self::Connect { .. } => TransportErrorKind::Connect,
            Self::Send { .. } => TransportErrorKind::Send,
            Self::Timeout { .. } => TransportErrorKind::Timeout,
        }
    }

    /// Returns the target device MAC.
    #[must_use]
    pub fn mac(&self) -> &str {
        match self {
            Self::Connect { mac, .. } | Self::Send { mac, .. } | Self::Timeout { mac, .. } => mac,
        }
    }
}
