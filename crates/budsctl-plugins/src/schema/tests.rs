//! Unit tests for schema validation.

use std::time::Duration;

use rstest::rstest;

use super::*;
use crate::error::PluginErrorKind;
use crate::model::TransportKind;
use crate::syntax::parse;

const RFCOMM_DOC: &str = r#"
id: demo
name: Demo Buds
match:
  name_contains: ["Demo"]
  mac_prefix: ["aa-bb-cc"]
transport:
  type: rfcomm
  channel: 12
features:
  anc:
    type: enum
    values:
      "on": "aa01"
      "off": "aa00"
"#;

const BLE_DOC: &str = r#"
id: my_ble_buds
name: My BLE Buds
match:
  name_contains: ["My BLE Buds"]
transport:
  type: ble
  service_uuid: "0000180F-0000-1000-8000-00805f9b34fb"
  write_char_uuid: "2a19"
  notify_char_uuid: "00002a1a-0000-1000-8000-00805f9b34fb"
  write_with_response: "false"
  timeout_s: 2.5
features:
  game_mode:
    type: enum
    values:
      "on": "aa01"
      "off": "aa00"
"#;

fn validate(text: &str) -> Result<PluginDocument, PluginError> {
    let root = parse("test.yaml", text)?;
    document("test.yaml", &root)
}

fn validation_path(text: &str) -> String {
    match validate(text) {
        Err(PluginError::Validation { path, .. }) => path,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn accepts_rfcomm_document_with_defaults() {
    let plugin = validate(RFCOMM_DOC).expect("valid document");
    assert_eq!(plugin.id(), "demo");
    assert_eq!(plugin.match_rules().mac_prefix(), &["AA:BB:CC"]);
    let TransportConfig::Rfcomm(config) = plugin.transport() else {
        panic!("expected rfcomm transport");
    };
    assert_eq!(config.channel(), 12);
    assert_eq!(config.timeout(), DEFAULT_RFCOMM_TIMEOUT);
    let anc = plugin.feature("anc").expect("anc feature");
    assert_eq!(anc.labels().collect::<Vec<_>>(), ["off", "on"]);
}

#[test]
fn accepts_ble_document() {
    let plugin = validate(BLE_DOC).expect("valid document");
    assert_eq!(plugin.transport().kind(), TransportKind::Ble);
    let TransportConfig::Ble(config) = plugin.transport() else {
        panic!("expected ble transport");
    };
    assert_eq!(
        config.service_uuid().as_str(),
        "0000180f-0000-1000-8000-00805f9b34fb"
    );
    assert_eq!(config.write_char_uuid().as_str(), "2a19");
    assert!(config.notify_char_uuid().is_some());
    assert!(!config.write_with_response());
    assert_eq!(config.timeout(), Duration::from_millis(2500));
}

#[test]
fn accepts_integer_timeout() {
    let text = RFCOMM_DOC.replace("channel: 12", "channel: 12\n  timeout_s: 2");
    let plugin = validate(&text).expect("valid document");
    assert_eq!(plugin.transport().timeout(), Duration::from_secs(2));
}

#[rstest]
#[case::missing_features(
    "id: x\nname: X\nmatch:\n  name_contains: [\"X\"]\ntransport:\n  type: rfcomm\n  channel: 1\n",
    "features"
)]
#[case::missing_match(
    "id: x\nname: X\ntransport:\n  type: rfcomm\n  channel: 1\nfeatures: {}\n",
    "match"
)]
#[case::empty_match(
    "id: x\nname: X\nmatch: {}\ntransport:\n  type: rfcomm\n  channel: 1\nfeatures:\n  a:\n    type: enum\n    values:\n      v: \"01\"\n",
    "match"
)]
#[case::empty_id(
    "id: \"\"\nname: X\n",
    "id"
)]
#[case::unknown_top_level(
    "id: x\nname: X\nversion: 2\n",
    "version"
)]
fn rejects_document_shape(#[case] text: &str, #[case] expected_path: &str) {
    assert_eq!(validation_path(text), expected_path);
}

#[rstest]
#[case::channel_high("channel: 12", "channel: 31", "transport.channel")]
#[case::channel_zero("channel: 12", "channel: 0", "transport.channel")]
#[case::channel_text("channel: 12", "channel: \"twelve\"", "transport.channel")]
#[case::missing_channel("  channel: 12\n", "", "transport.channel")]
#[case::bad_type("type: rfcomm", "type: serial", "transport.type")]
#[case::ble_key_on_rfcomm(
    "channel: 12",
    "channel: 12\n  service_uuid: \"180f\"",
    "transport.service_uuid"
)]
#[case::zero_timeout("channel: 12", "channel: 12\n  timeout_s: 0", "transport.timeout_s")]
#[case::negative_timeout("channel: 12", "channel: 12\n  timeout_s: -1.5", "transport.timeout_s")]
#[case::bad_mac_prefix("aa-bb-cc", "zz:00", "match.mac_prefix")]
#[case::bad_hex("\"aa01\"", "\"xyz\"", "features.anc.values.on")]
#[case::upper_hex("\"aa01\"", "\"AA01\"", "features.anc.values.on")]
#[case::odd_hex("\"aa01\"", "\"aa0\"", "features.anc.values.on")]
#[case::unquoted_integer("\"aa01\"", "12", "features.anc.values.on")]
#[case::feature_type("type: enum", "type: range", "features.anc.type")]
#[case::feature_key("type: enum", "type: enum\n    default: \"on\"", "features.anc.default")]
fn rejects_field_violations(
    #[case] from: &str,
    #[case] to: &str,
    #[case] expected_path: &str,
) {
    let text = RFCOMM_DOC.replacen(from, to, 1);
    assert_eq!(validation_path(&text), expected_path);
}

#[rstest]
#[case::bad_service("\"0000180F-0000-1000-8000-00805f9b34fb\"", "\"180\"", "transport.service_uuid")]
#[case::bad_write("\"2a19\"", "\"2a19-0000\"", "transport.write_char_uuid")]
#[case::bad_flag("\"false\"", "\"sometimes\"", "transport.write_with_response")]
#[case::rfcomm_key_on_ble("timeout_s: 2.5", "timeout_s: 2.5\n  channel: 3", "transport.channel")]
fn rejects_ble_violations(#[case] from: &str, #[case] to: &str, #[case] expected_path: &str) {
    let text = BLE_DOC.replacen(from, to, 1);
    assert_eq!(validation_path(&text), expected_path);
}

#[test]
fn oversized_payload_is_a_validation_error() {
    let huge = format!("\"{}\"", "00".repeat(513));
    let text = RFCOMM_DOC.replacen("\"aa01\"", &huge, 1);
    let error = validate(&text).expect_err("payload exceeds the limit");
    assert_eq!(error.kind(), PluginErrorKind::Validation);
    assert!(error.to_string().contains("512"), "message: {error}");
}

#[test]
fn errors_carry_origin() {
    let text = RFCOMM_DOC.replacen("channel: 12", "channel: 99", 1);
    let error = validate(&text).expect_err("channel out of range");
    assert_eq!(error.origin(), "test.yaml");
    assert!(error.to_string().contains("99"));
}
