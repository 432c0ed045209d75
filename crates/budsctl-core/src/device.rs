//! Discovered Bluetooth devices.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Name shown for devices that did not report one.
pub const UNKNOWN_DEVICE_NAME: &str = "<unknown-device>";

/// Number of octets in a Bluetooth device address.
const OCTETS: usize = 6;

/// A Bluetooth device address, displayed as `AA:BB:CC:DD:EE:FF`.
///
/// # Example
///
/// ```
/// use budsctl_core::MacAddress;
///
/// let mac: MacAddress = "88-92-cc-11-22-33".parse().expect("valid address");
/// assert_eq!(mac.to_string(), "88:92:CC:11:22:33");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; OCTETS]);

impl MacAddress {
    /// Creates an address from its octets, most significant first.
    #[must_use]
    pub const fn new(octets: [u8; OCTETS]) -> Self {
        Self(octets)
    }

    /// Returns the octets, most significant first.
    #[must_use]
    pub const fn octets(&self) -> [u8; OCTETS] {
        self.0
    }
}

/// Text that is not a six-octet Bluetooth address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' is not a Bluetooth address (expected AA:BB:CC:DD:EE:FF)")]
pub struct InvalidMacAddress {
    /// Text as supplied.
    pub value: String,
}

impl FromStr for MacAddress {
    type Err = InvalidMacAddress;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidMacAddress {
            value: text.to_owned(),
        };
        let mut octets = [0_u8; OCTETS];
        let mut parts = text.trim().split([':', '-']);
        for octet in &mut octets {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 || !part.bytes().all(|byte| byte.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, octet) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(":")?;
            }
            write!(f, "{octet:02X}")?;
        }
        Ok(())
    }
}

/// A device reported by discovery. The name may be unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedDevice {
    mac: MacAddress,
    name: Option<String>,
}

impl DetectedDevice {
    /// Creates a device record. Blank names are treated as unknown.
    #[must_use]
    pub fn new(mac: MacAddress, name: Option<String>) -> Self {
        Self {
            mac,
            name: name
                .map(|text| text.trim().to_owned())
                .filter(|text| !text.is_empty()),
        }
    }

    /// Creates a device record with a known name.
    #[must_use]
    pub fn named(mac: MacAddress, name: impl Into<String>) -> Self {
        Self::new(mac, Some(name.into()))
    }

    /// Returns the device address.
    #[must_use]
    pub const fn mac(&self) -> MacAddress {
        self.mac
    }

    /// Returns the advertised name, if known.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the name, or a placeholder when it is unknown.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or(UNKNOWN_DEVICE_NAME)
    }
}

impl fmt::Display for DetectedDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.mac, self.display_name())
    }
}
