//! Payload bytes sourced verbatim from plugin documents.

use std::fmt::{self, Write as _};

use super::ValueError;

/// Largest decoded payload a plugin value may carry.
pub const MAX_PAYLOAD_BYTES: usize = 512;

/// Raw bytes sent to a device for one feature value.
///
/// Payloads are written in plugin documents as lowercase hexadecimal text and
/// decoded once at load time. Nothing is computed at send time: no
/// checksums, counters, or session bytes.
///
/// # Example
///
/// ```
/// use budsctl_plugins::Payload;
///
/// let payload = Payload::from_hex("aa0a01").expect("valid hex");
/// assert_eq!(payload.as_bytes(), &[0xaa, 0x0a, 0x01]);
/// assert_eq!(payload.to_hex(), "aa0a01");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Decodes lowercase hexadecimal text into a payload.
    ///
    /// Surrounding whitespace is ignored. The remaining digits must be
    /// `[0-9a-f]`, of even count, and decode to at most
    /// [`MAX_PAYLOAD_BYTES`] bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`ValueError`] describing the first encoding rule violated.
    pub fn from_hex(text: &str) -> Result<Self, ValueError> {
        let digits = text.trim();
        if digits.is_empty() {
            return Err(ValueError::EmptyPayload);
        }
        if let Some(found) = digits
            .chars()
            .find(|c| !matches!(c, '0'..='9' | 'a'..='f'))
        {
            return Err(ValueError::InvalidHexDigit { found });
        }
        if !digits.len().is_multiple_of(2) {
            return Err(ValueError::OddLength {
                digits: digits.len(),
            });
        }

        let bytes = digits
            .as_bytes()
            .chunks_exact(2)
            .map(decode_pair)
            .collect::<Option<Vec<u8>>>()
            .ok_or(ValueError::EmptyPayload)?;
        Self::new(bytes)
    }

    /// Wraps already-decoded bytes, enforcing the size limit.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::EmptyPayload`] for an empty buffer and
    /// [`ValueError::PayloadTooLarge`] above [`MAX_PAYLOAD_BYTES`].
    pub fn new(bytes: Vec<u8>) -> Result<Self, ValueError> {
        if bytes.is_empty() {
            return Err(ValueError::EmptyPayload);
        }
        if bytes.len() > MAX_PAYLOAD_BYTES {
            return Err(ValueError::PayloadTooLarge {
                len: bytes.len(),
                max: MAX_PAYLOAD_BYTES,
            });
        }
        Ok(Self(bytes))
    }

    /// Returns the payload bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the number of bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; payloads are never empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders the payload as lowercase hexadecimal text.
    #[must_use]
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Renders arbitrary bytes as lowercase hexadecimal text.
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
            // Writing to a String cannot fail.
            drop(write!(out, "{byte:02x}"));
            out
        })
}

fn decode_pair(pair: &[u8]) -> Option<u8> {
    let [high, low] = pair else {
        return None;
    };
    let high_nibble = char::from(*high).to_digit(16)?;
    let low_nibble = char::from(*low).to_digit(16)?;
    u8::try_from((high_nibble << 4) | low_nibble).ok()
}
