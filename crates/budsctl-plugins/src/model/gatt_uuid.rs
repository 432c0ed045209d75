//! GATT UUIDs as written in plugin documents.

use std::fmt;

use uuid::Uuid;

use super::ValueError;

/// The Bluetooth base UUID `00000000-0000-1000-8000-00805f9b34fb`.
const BLUETOOTH_BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5f9b_34fb;

/// Offsets of the hyphens in the canonical 128-bit form.
const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// A service or characteristic UUID in 16-, 32-, or 128-bit form.
///
/// The written form is kept (lowercased) for display; [`GattUuid::uuid`]
/// expands short forms onto the Bluetooth base UUID.
///
/// # Example
///
/// ```
/// use budsctl_plugins::GattUuid;
///
/// let short = GattUuid::parse("180F").expect("16-bit form");
/// assert_eq!(short.as_str(), "180f");
/// assert_eq!(
///     short.uuid().to_string(),
///     "0000180f-0000-1000-8000-00805f9b34fb"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GattUuid {
    text: String,
    uuid: Uuid,
}

impl GattUuid {
    /// Parses a 4-digit, 8-digit, or canonical hyphenated UUID string.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidUuid`] when the text has any other shape.
    pub fn parse(text: &str) -> Result<Self, ValueError> {
        let normalised = text.trim().to_ascii_lowercase();
        let invalid = || ValueError::InvalidUuid {
            value: text.to_owned(),
        };

        let uuid = match normalised.len() {
            4 | 8 if normalised.chars().all(|c| c.is_ascii_hexdigit()) => {
                let short = u32::from_str_radix(&normalised, 16).map_err(|_| invalid())?;
                Uuid::from_u128(BLUETOOTH_BASE_UUID | (u128::from(short) << 96))
            }
            36 if is_canonical(&normalised) => {
                Uuid::parse_str(&normalised).map_err(|_| invalid())?
            }
            _ => return Err(invalid()),
        };

        Ok(Self {
            text: normalised,
            uuid,
        })
    }

    /// Returns the lowercased written form.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.text.as_str()
    }

    /// Returns the full 128-bit UUID.
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }
}

impl fmt::Display for GattUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn is_canonical(text: &str) -> bool {
    text.char_indices().all(|(index, c)| {
        if HYPHEN_POSITIONS.contains(&index) {
            c == '-'
        } else {
            c.is_ascii_hexdigit()
        }
    })
}
