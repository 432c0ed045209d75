//! Typed representation of a validated plugin document.
//!
//! A [`PluginDocument`] declares everything needed to act on one device
//! model: its identity, the [`MatchRules`] used to recognise discovered
//! devices, a [`TransportConfig`] naming the wire mechanism, and a map of
//! [`FeatureSpec`]s. Values are immutable once constructed; constructors
//! validate their inputs so invalid states are rejected early.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::error::PluginError;

mod gatt_uuid;
mod payload;

pub use self::gatt_uuid::GattUuid;
pub use self::payload::{MAX_PAYLOAD_BYTES, Payload, to_hex};

/// Lowest RFCOMM channel a plugin may address.
pub const MIN_RFCOMM_CHANNEL: u8 = 1;

/// Highest RFCOMM channel a plugin may address.
pub const MAX_RFCOMM_CHANNEL: u8 = 30;

/// Timeout applied to RFCOMM plugins that omit `timeout_s`.
pub const DEFAULT_RFCOMM_TIMEOUT: Duration = Duration::from_secs(3);

/// Timeout applied to BLE plugins that omit `timeout_s`.
pub const DEFAULT_BLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest MAC prefix, in hex digits (six octets).
const MAX_MAC_PREFIX_DIGITS: usize = 12;

/// A single field value that breaks an encoding or range rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// A payload contained no hex digits.
    #[error("payload must not be empty")]
    EmptyPayload,
    /// A payload contained a character outside `[0-9a-f]`.
    #[error("payload must contain only [0-9a-f], found '{found}'")]
    InvalidHexDigit {
        /// First offending character.
        found: char,
    },
    /// A payload had an odd number of hex digits.
    #[error("payload must have an even number of hex digits, got {digits}")]
    OddLength {
        /// Number of digits supplied.
        digits: usize,
    },
    /// A payload decoded to more bytes than allowed.
    #[error("payload decodes to {len} bytes, exceeding the {max}-byte limit")]
    PayloadTooLarge {
        /// Decoded length.
        len: usize,
        /// Allowed maximum.
        max: usize,
    },
    /// A UUID was not in 16-, 32-, or 128-bit canonical form.
    #[error("'{value}' must be a 16-bit, 32-bit, or 128-bit UUID string")]
    InvalidUuid {
        /// Text as written.
        value: String,
    },
    /// An RFCOMM channel fell outside `1..=30`.
    #[error("RFCOMM channel {channel} is outside {MIN_RFCOMM_CHANNEL}..={MAX_RFCOMM_CHANNEL}")]
    ChannelOutOfRange {
        /// Channel as written.
        channel: i64,
    },
    /// A timeout was zero, negative, or not a finite number.
    #[error("timeout must be a positive number of seconds, got {value}")]
    InvalidTimeout {
        /// Timeout as written.
        value: String,
    },
    /// A MAC prefix contained something other than hex digits and colons.
    #[error("MAC prefix '{value}' must be up to six hex octets separated by ':'")]
    InvalidMacPrefix {
        /// Prefix as written.
        value: String,
    },
    /// A match pattern was empty and would match every device.
    #[error("match patterns must not be empty")]
    EmptyPattern,
    /// An enum feature declared no values.
    #[error("feature must define at least one value")]
    EmptyValues,
    /// A feature value label was empty.
    #[error("value labels must not be empty")]
    EmptyLabel,
    /// A feature value label appeared twice.
    #[error("value label '{label}' is defined more than once")]
    DuplicateLabel {
        /// Repeated label.
        label: String,
    },
}

/// Converts a `timeout_s` number into a [`Duration`].
///
/// # Errors
///
/// Returns [`ValueError::InvalidTimeout`] unless `secs` is finite and
/// strictly positive.
pub fn timeout_from_secs(secs: f64) -> Result<Duration, ValueError> {
    let invalid = || ValueError::InvalidTimeout {
        value: secs.to_string(),
    };
    if !secs.is_finite() || secs <= 0.0 {
        return Err(invalid());
    }
    let timeout = Duration::try_from_secs_f64(secs).map_err(|_| invalid())?;
    if timeout.is_zero() {
        return Err(invalid());
    }
    Ok(timeout)
}

/// Name-substring and MAC-prefix patterns that recognise a device.
///
/// Patterns are alternatives: a device matches when any single pattern does.
///
/// # Example
///
/// ```
/// use budsctl_plugins::MatchRules;
///
/// let rules = MatchRules::new(vec!["OnePlus Buds".into()], vec!["88:92:cc".into()])
///     .expect("valid patterns");
/// assert_eq!(rules.mac_prefix(), &["88:92:CC"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRules {
    name_contains: Vec<String>,
    mac_prefix: Vec<String>,
}

impl MatchRules {
    /// Builds match rules, canonicalising MAC prefixes to upper-case octets.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::EmptyPattern`] for blank patterns and
    /// [`ValueError::InvalidMacPrefix`] for malformed prefixes.
    pub fn new(name_contains: Vec<String>, mac_prefix: Vec<String>) -> Result<Self, ValueError> {
        if name_contains.iter().any(|pattern| pattern.trim().is_empty()) {
            return Err(ValueError::EmptyPattern);
        }
        let prefixes = mac_prefix
            .iter()
            .map(|prefix| normalise_mac_prefix(prefix))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name_contains,
            mac_prefix: prefixes,
        })
    }

    /// Returns the case-insensitive name substrings.
    #[must_use]
    pub fn name_contains(&self) -> &[String] {
        &self.name_contains
    }

    /// Returns the MAC prefixes in `XX:XX` octet form.
    #[must_use]
    pub fn mac_prefix(&self) -> &[String] {
        &self.mac_prefix
    }

    /// Returns `true` when no pattern is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name_contains.is_empty() && self.mac_prefix.is_empty()
    }
}

/// Canonicalises a prefix into upper-case `XX:XX:X` octet form, so `8892cc`,
/// `88-92-CC` and `88:92:cc` all become `88:92:CC`.
fn normalise_mac_prefix(prefix: &str) -> Result<String, ValueError> {
    let invalid = || ValueError::InvalidMacPrefix {
        value: prefix.to_owned(),
    };
    let trimmed = prefix.trim();
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_hexdigit() || c == ':' || c == '-')
    {
        return Err(invalid());
    }
    let digits: Vec<char> = trimmed
        .chars()
        .filter(char::is_ascii_hexdigit)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if digits.is_empty() || digits.len() > MAX_MAC_PREFIX_DIGITS {
        return Err(invalid());
    }
    let octets: Vec<String> = digits.chunks(2).map(String::from_iter).collect();
    Ok(octets.join(":"))
}

/// Wire mechanism used to reach a device.
///
/// # Example
///
/// ```
/// use budsctl_plugins::TransportKind;
///
/// assert_eq!(TransportKind::Rfcomm.as_str(), "rfcomm");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Connection-oriented RFCOMM socket.
    Rfcomm,
    /// BLE GATT characteristic write.
    Ble,
}

impl TransportKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rfcomm => "rfcomm",
            Self::Ble => "ble",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RFCOMM addressing and timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RfcommConfig {
    channel: u8,
    timeout: Duration,
}

impl RfcommConfig {
    /// Creates a configuration with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::ChannelOutOfRange`] outside `1..=30`.
    pub fn new(channel: u8) -> Result<Self, ValueError> {
        if !(MIN_RFCOMM_CHANNEL..=MAX_RFCOMM_CHANNEL).contains(&channel) {
            return Err(ValueError::ChannelOutOfRange {
                channel: i64::from(channel),
            });
        }
        Ok(Self {
            channel,
            timeout: DEFAULT_RFCOMM_TIMEOUT,
        })
    }

    /// Overrides the connect and response timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidTimeout`] for a zero duration.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ValueError> {
        self.timeout = checked_timeout(timeout)?;
        Ok(self)
    }

    /// Returns the RFCOMM channel.
    #[must_use]
    pub const fn channel(&self) -> u8 {
        self.channel
    }

    /// Returns the connect and response timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// BLE GATT addressing, write mode, and timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BleConfig {
    service_uuid: GattUuid,
    write_char_uuid: GattUuid,
    notify_char_uuid: Option<GattUuid>,
    write_with_response: bool,
    timeout: Duration,
}

impl BleConfig {
    /// Creates a configuration writing with response and no notification.
    #[must_use]
    pub const fn new(service_uuid: GattUuid, write_char_uuid: GattUuid) -> Self {
        Self {
            service_uuid,
            write_char_uuid,
            notify_char_uuid: None,
            write_with_response: true,
            timeout: DEFAULT_BLE_TIMEOUT,
        }
    }

    /// Waits for one notification on this characteristic after writing.
    #[must_use]
    pub fn with_notify_char(mut self, notify_char_uuid: GattUuid) -> Self {
        self.notify_char_uuid = Some(notify_char_uuid);
        self
    }

    /// Chooses between acknowledged and unacknowledged writes.
    #[must_use]
    pub const fn with_write_with_response(mut self, write_with_response: bool) -> Self {
        self.write_with_response = write_with_response;
        self
    }

    /// Overrides the connect and notification timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidTimeout`] for a zero duration.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ValueError> {
        self.timeout = checked_timeout(timeout)?;
        Ok(self)
    }

    /// Returns the service UUID.
    #[must_use]
    pub const fn service_uuid(&self) -> &GattUuid {
        &self.service_uuid
    }

    /// Returns the write characteristic UUID.
    #[must_use]
    pub const fn write_char_uuid(&self) -> &GattUuid {
        &self.write_char_uuid
    }

    /// Returns the notify characteristic UUID, if configured.
    #[must_use]
    pub const fn notify_char_uuid(&self) -> Option<&GattUuid> {
        self.notify_char_uuid.as_ref()
    }

    /// Returns `true` when writes require an acknowledgement.
    #[must_use]
    pub const fn write_with_response(&self) -> bool {
        self.write_with_response
    }

    /// Returns the connect and notification timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn checked_timeout(timeout: Duration) -> Result<Duration, ValueError> {
    if timeout.is_zero() {
        return Err(ValueError::InvalidTimeout {
            value: String::from("0"),
        });
    }
    Ok(timeout)
}

/// Transport configuration; exactly one variant per plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    /// Reach the device over an RFCOMM socket.
    Rfcomm(RfcommConfig),
    /// Reach the device through a GATT characteristic.
    Ble(BleConfig),
}

impl TransportConfig {
    /// Returns the transport tag.
    #[must_use]
    pub const fn kind(&self) -> TransportKind {
        match self {
            Self::Rfcomm(_) => TransportKind::Rfcomm,
            Self::Ble(_) => TransportKind::Ble,
        }
    }

    /// Returns the timeout bounding connect and response waits.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        match self {
            Self::Rfcomm(config) => config.timeout(),
            Self::Ble(config) => config.timeout(),
        }
    }
}

impl From<RfcommConfig> for TransportConfig {
    fn from(config: RfcommConfig) -> Self {
        Self::Rfcomm(config)
    }
}

impl From<BleConfig> for TransportConfig {
    fn from(config: BleConfig) -> Self {
        Self::Ble(config)
    }
}

/// Kind of a feature. Only closed enumerations exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    /// A closed set of labelled payloads.
    Enum,
}

impl FeatureKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enum => "enum",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A controllable capability and its labelled payloads.
///
/// # Example
///
/// ```
/// use budsctl_plugins::{FeatureSpec, Payload};
///
/// let anc = FeatureSpec::enumeration([
///     ("on", Payload::from_hex("aa01").expect("hex")),
///     ("off", Payload::from_hex("aa00").expect("hex")),
/// ])
/// .expect("valid feature");
/// assert_eq!(anc.labels().collect::<Vec<_>>(), ["off", "on"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSpec {
    kind: FeatureKind,
    values: BTreeMap<String, Payload>,
}

impl FeatureSpec {
    /// Builds an enum feature from `(label, payload)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::EmptyValues`] when no pair is given,
    /// [`ValueError::EmptyLabel`] for a blank label, and
    /// [`ValueError::DuplicateLabel`] when a label repeats.
    pub fn enumeration<I, S>(values: I) -> Result<Self, ValueError>
    where
        I: IntoIterator<Item = (S, Payload)>,
        S: Into<String>,
    {
        let mut labelled = BTreeMap::new();
        for (label, payload) in values {
            let key: String = label.into();
            if key.trim().is_empty() {
                return Err(ValueError::EmptyLabel);
            }
            match labelled.entry(key) {
                Entry::Occupied(entry) => {
                    return Err(ValueError::DuplicateLabel {
                        label: entry.key().clone(),
                    });
                }
                Entry::Vacant(entry) => {
                    entry.insert(payload);
                }
            }
        }
        if labelled.is_empty() {
            return Err(ValueError::EmptyValues);
        }
        Ok(Self {
            kind: FeatureKind::Enum,
            values: labelled,
        })
    }

    /// Returns the feature kind.
    #[must_use]
    pub const fn kind(&self) -> FeatureKind {
        self.kind
    }

    /// Returns the value labels in sorted order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Looks up the payload for a label.
    #[must_use]
    pub fn payload(&self, label: &str) -> Option<&Payload> {
        self.values.get(label)
    }

    /// Returns the label-to-payload map.
    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, Payload> {
        &self.values
    }
}

/// A validated plugin document.
///
/// Documents are constructed by the loader or programmatically via
/// [`PluginDocument::new`] and [`PluginDocument::with_feature`]; call
/// [`PluginDocument::validate`] before relying on the document-level
/// invariants (non-empty id, at least one match pattern and one feature).
///
/// # Example
///
/// ```
/// use budsctl_plugins::{
///     FeatureSpec, MatchRules, Payload, PluginDocument, RfcommConfig,
/// };
///
/// let rules = MatchRules::new(vec!["Demo".into()], vec![]).expect("rules");
/// let transport = RfcommConfig::new(15).expect("channel");
/// let anc = FeatureSpec::enumeration([("on", Payload::from_hex("aa01").expect("hex"))])
///     .expect("feature");
/// let plugin = PluginDocument::new("demo", "Demo Buds", rules, transport.into())
///     .with_feature("anc", anc);
///
/// assert!(plugin.validate().is_ok());
/// assert_eq!(plugin.feature_names().collect::<Vec<_>>(), ["anc"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDocument {
    id: String,
    name: String,
    match_rules: MatchRules,
    transport: TransportConfig,
    features: BTreeMap<String, FeatureSpec>,
}

impl PluginDocument {
    /// Creates a document with no features.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        match_rules: MatchRules,
        transport: TransportConfig,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            match_rules,
            transport,
            features: BTreeMap::new(),
        }
    }

    /// Adds or replaces a feature.
    #[must_use]
    pub fn with_feature(mut self, name: impl Into<String>, feature: FeatureSpec) -> Self {
        self.features.insert(name.into(), feature);
        self
    }

    /// Checks the document-level invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Validation`] if the id is blank, no match
    /// pattern is declared, or no feature is declared.
    pub fn validate(&self) -> Result<(), PluginError> {
        let violation = |path: &str, message: &str| PluginError::Validation {
            origin: format!("plugin '{}'", self.id),
            path: path.to_owned(),
            message: message.to_owned(),
        };
        if self.id.trim().is_empty() {
            return Err(violation("id", "plugin id must not be empty"));
        }
        if self.match_rules.is_empty() {
            return Err(violation(
                "match",
                "at least one of name_contains or mac_prefix must be non-empty",
            ));
        }
        if self.features.is_empty() {
            return Err(violation("features", "at least one feature is required"));
        }
        Ok(())
    }

    /// Returns the plugin id.
    #[must_use]
    pub const fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the human-readable model name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the device match rules.
    #[must_use]
    pub const fn match_rules(&self) -> &MatchRules {
        &self.match_rules
    }

    /// Returns the transport configuration.
    #[must_use]
    pub const fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    /// Returns all features keyed by name.
    #[must_use]
    pub const fn features(&self) -> &BTreeMap<String, FeatureSpec> {
        &self.features
    }

    /// Looks up a feature by name.
    #[must_use]
    pub fn feature(&self, name: &str) -> Option<&FeatureSpec> {
        self.features.get(name)
    }

    /// Returns feature names in sorted order.
    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }
}
