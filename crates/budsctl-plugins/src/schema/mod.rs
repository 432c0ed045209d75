//! Closed-schema validation from [`Node`] trees to [`PluginDocument`]s.
//!
//! Every field is checked for presence, type, and semantic range. Unknown
//! keys are rejected at each level so typos surface as errors instead of
//! being ignored. Failures name the dotted path of the offending field.

use std::time::Duration;

use crate::error::PluginError;
use crate::model::{
    BleConfig, DEFAULT_BLE_TIMEOUT, DEFAULT_RFCOMM_TIMEOUT, FeatureSpec, GattUuid, MatchRules,
    Payload, PluginDocument, RfcommConfig, TransportConfig, ValueError, timeout_from_secs,
};
use crate::syntax::{Node, ROOT_PATH, join_path};

const TOP_LEVEL_KEYS: &[&str] = &["id", "name", "match", "transport", "features"];
const MATCH_KEYS: &[&str] = &["name_contains", "mac_prefix"];
const RFCOMM_KEYS: &[&str] = &["type", "channel", "timeout_s"];
const BLE_KEYS: &[&str] = &[
    "type",
    "service_uuid",
    "write_char_uuid",
    "notify_char_uuid",
    "write_with_response",
    "timeout_s",
];
const FEATURE_KEYS: &[&str] = &["type", "values"];

/// Converts a parsed document tree into a validated [`PluginDocument`].
///
/// # Errors
///
/// Returns [`PluginError::Validation`] naming the first offending field.
///
/// # Example
///
/// ```
/// use budsctl_plugins::schema::document;
/// use budsctl_plugins::syntax::parse;
///
/// let root = parse("inline", "id: x\nname: X\n").expect("valid YAML");
/// let error = document("inline", &root).expect_err("match is missing");
/// assert!(error.to_string().contains("match"));
/// ```
pub fn document(origin: &str, root: &Node) -> Result<PluginDocument, PluginError> {
    let top = Fields::of(origin, ROOT_PATH, root)?;
    top.reject_unknown(TOP_LEVEL_KEYS, "document")?;

    let id = top.non_empty_string("id")?;
    let name = top.non_empty_string("name")?;
    let match_rules = match_rules(&top.nested("match")?)?;
    let transport = transport(&top.nested("transport")?)?;

    let features_node = top.nested("features")?;
    if features_node.entries.is_empty() {
        return Err(features_node.invalid("at least one feature is required"));
    }
    let mut plugin = PluginDocument::new(id, name, match_rules, transport);
    for (feature_name, node) in features_node.entries {
        let path = join_path(&features_node.path, feature_name);
        let spec = feature(&Fields::of(origin, &path, node)?)?;
        plugin = plugin.with_feature(feature_name.as_str(), spec);
    }

    plugin.validate().map_err(|err| match err {
        PluginError::Validation { path, message, .. } => PluginError::Validation {
            origin: origin.to_owned(),
            path,
            message,
        },
        other => other,
    })?;
    Ok(plugin)
}

fn match_rules(fields: &Fields<'_>) -> Result<MatchRules, PluginError> {
    fields.reject_unknown(MATCH_KEYS, "match")?;
    let name_contains = fields.optional_string_list("name_contains")?;
    let mac_prefix = fields.optional_string_list("mac_prefix")?;
    let rules = MatchRules::new(name_contains, mac_prefix).map_err(|err| {
        let key = match err {
            ValueError::InvalidMacPrefix { .. } => "mac_prefix",
            _ => "name_contains",
        };
        fields.invalid_value(key, &err)
    })?;
    if rules.is_empty() {
        return Err(
            fields.invalid("at least one of name_contains or mac_prefix must be non-empty")
        );
    }
    Ok(rules)
}

fn transport(fields: &Fields<'_>) -> Result<TransportConfig, PluginError> {
    let kind = fields.required_string("type")?;
    match kind {
        "rfcomm" => rfcomm(fields).map(TransportConfig::Rfcomm),
        "ble" => ble(fields).map(TransportConfig::Ble),
        other => Err(fields.invalid_at(
            "type",
            &format!("unsupported transport type '{other}', expected 'rfcomm' or 'ble'"),
        )),
    }
}

fn rfcomm(fields: &Fields<'_>) -> Result<RfcommConfig, PluginError> {
    fields.reject_unknown(RFCOMM_KEYS, "rfcomm transport")?;
    let channel = fields.required_integer("channel")?;
    let config = u8::try_from(channel)
        .map_err(|_| ValueError::ChannelOutOfRange {
            channel: i64::try_from(channel).unwrap_or(i64::MAX),
        })
        .and_then(RfcommConfig::new)
        .map_err(|err| fields.invalid_value("channel", &err))?;
    let timeout = fields.optional_timeout("timeout_s", DEFAULT_RFCOMM_TIMEOUT)?;
    config
        .with_timeout(timeout)
        .map_err(|err| fields.invalid_value("timeout_s", &err))
}

fn ble(fields: &Fields<'_>) -> Result<BleConfig, PluginError> {
    fields.reject_unknown(BLE_KEYS, "ble transport")?;
    let service = fields.uuid("service_uuid")?;
    let write = fields.uuid("write_char_uuid")?;
    let mut config = BleConfig::new(service, write);
    if fields.get("notify_char_uuid").is_some() {
        config = config.with_notify_char(fields.uuid("notify_char_uuid")?);
    }
    if let Some(node) = fields.get("write_with_response") {
        let flag = boolean(node)
            .ok_or_else(|| fields.invalid_at("write_with_response", "must be boolean true/false"))?;
        config = config.with_write_with_response(flag);
    }
    let timeout = fields.optional_timeout("timeout_s", DEFAULT_BLE_TIMEOUT)?;
    config
        .with_timeout(timeout)
        .map_err(|err| fields.invalid_value("timeout_s", &err))
}

fn feature(fields: &Fields<'_>) -> Result<FeatureSpec, PluginError> {
    fields.reject_unknown(FEATURE_KEYS, "feature")?;
    let kind = fields.required_string("type")?;
    if kind != "enum" {
        return Err(fields.invalid_at(
            "type",
            &format!("unsupported feature type '{kind}', expected 'enum'"),
        ));
    }

    let values = fields.nested("values")?;
    let mut labelled = Vec::with_capacity(values.entries.len());
    for (label, node) in values.entries {
        let Node::String(text) = node else {
            return Err(values.invalid_at(
                label,
                &format!(
                    "payload must be a quoted hex string, found {}",
                    node.type_name()
                ),
            ));
        };
        let payload = Payload::from_hex(text).map_err(|err| values.invalid_value(label, &err))?;
        labelled.push((label.clone(), payload));
    }
    FeatureSpec::enumeration(labelled).map_err(|err| values.invalid_value_here(&err))
}

fn boolean(node: &Node) -> Option<bool> {
    match node {
        Node::Bool(flag) => Some(*flag),
        Node::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// A mapping node paired with its location for diagnostics.
struct Fields<'a> {
    origin: &'a str,
    path: String,
    entries: &'a [(String, Node)],
}

impl<'a> Fields<'a> {
    fn of(origin: &'a str, path: &str, node: &'a Node) -> Result<Self, PluginError> {
        match node {
            Node::Mapping(entries) => Ok(Self {
                origin,
                path: path.to_owned(),
                entries,
            }),
            other => Err(validation(
                origin,
                path,
                &format!("expected a mapping, found {}", other.type_name()),
            )),
        }
    }

    fn get(&self, key: &str) -> Option<&'a Node> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, node)| node)
    }

    fn required(&self, key: &str) -> Result<&'a Node, PluginError> {
        self.get(key)
            .ok_or_else(|| self.invalid_at(key, "required field is missing"))
    }

    fn nested(&self, key: &str) -> Result<Self, PluginError> {
        let node = self.required(key)?;
        Self::of(self.origin, &join_path(&self.path, key), node)
    }

    fn reject_unknown(&self, allowed: &[&str], context: &str) -> Result<(), PluginError> {
        self.entries
            .iter()
            .find(|(key, _)| !allowed.contains(&key.as_str()))
            .map_or(Ok(()), |(key, _)| {
                Err(self.invalid_at(
                    key,
                    &format!(
                        "unknown key '{key}' for {context}; expected one of: {}",
                        allowed.join(", ")
                    ),
                ))
            })
    }

    fn required_string(&self, key: &str) -> Result<&'a str, PluginError> {
        match self.required(key)? {
            Node::String(text) => Ok(text.as_str()),
            other => Err(self.invalid_at(
                key,
                &format!("expected a string, found {}", other.type_name()),
            )),
        }
    }

    fn non_empty_string(&self, key: &str) -> Result<String, PluginError> {
        let text = self.required_string(key)?;
        if text.trim().is_empty() {
            return Err(self.invalid_at(key, "must not be empty"));
        }
        Ok(text.to_owned())
    }

    fn required_integer(&self, key: &str) -> Result<i128, PluginError> {
        match self.required(key)? {
            Node::Integer(value) => Ok(*value),
            other => Err(self.invalid_at(
                key,
                &format!("expected an integer, found {}", other.type_name()),
            )),
        }
    }

    fn optional_string_list(&self, key: &str) -> Result<Vec<String>, PluginError> {
        let items = match self.get(key) {
            None | Some(Node::Null) => return Ok(Vec::new()),
            Some(Node::Sequence(items)) => items,
            Some(other) => {
                return Err(self.invalid_at(
                    key,
                    &format!("expected a list of strings, found {}", other.type_name()),
                ));
            }
        };
        items
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Node::String(text) => Ok(text.clone()),
                other => Err(self.invalid_at(
                    &format!("{key}[{index}]"),
                    &format!("expected a string, found {}", other.type_name()),
                )),
            })
            .collect()
    }

    fn optional_timeout(&self, key: &str, default: Duration) -> Result<Duration, PluginError> {
        let secs = match self.get(key) {
            None => return Ok(default),
            Some(Node::Float(value)) => *value,
            Some(Node::Integer(value)) => i32::try_from(*value).map(f64::from).map_err(|_| {
                self.invalid_value(
                    key,
                    &ValueError::InvalidTimeout {
                        value: value.to_string(),
                    },
                )
            })?,
            Some(other) => {
                return Err(self.invalid_at(
                    key,
                    &format!("expected a number of seconds, found {}", other.type_name()),
                ));
            }
        };
        timeout_from_secs(secs).map_err(|err| self.invalid_value(key, &err))
    }

    fn uuid(&self, key: &str) -> Result<GattUuid, PluginError> {
        let text = self.required_string(key)?;
        GattUuid::parse(text).map_err(|err| self.invalid_value(key, &err))
    }

    fn invalid(&self, message: &str) -> PluginError {
        validation(self.origin, &self.path, message)
    }

    fn invalid_at(&self, key: &str, message: &str) -> PluginError {
        validation(self.origin, &join_path(&self.path, key), message)
    }

    fn invalid_value(&self, key: &str, err: &ValueError) -> PluginError {
        self.invalid_at(key, &err.to_string())
    }

    fn invalid_value_here(&self, err: &ValueError) -> PluginError {
        self.invalid(&err.to_string())
    }
}

fn validation(origin: &str, path: &str, message: &str) -> PluginError {
    PluginError::Validation {
        origin: origin.to_owned(),
        path: path.to_owned(),
        message: message.to_owned(),
    }
}

#[cfg(test)]
mod tests;
