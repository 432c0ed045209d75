//! Unit tests for core errors.

use std::time::Duration;

use rstest::rstest;

use super::*;

const MAC: &str = "88:92:CC:11:22:33";

fn summary(plugin_id: &str, name: Option<&str>) -> CandidateSummary {
    CandidateSummary {
        mac: MAC.parse().expect("valid address"),
        name: name.map(str::to_owned),
        plugin_id: plugin_id.to_owned(),
    }
}

#[rstest]
#[case::load(
    Error::Plugin(PluginError::NotAMapping { origin: String::from("a.yaml") }),
    ErrorKind::PluginLoad
)]
#[case::validation(
    Error::Plugin(PluginError::Validation {
        origin: String::from("a.yaml"),
        path: String::from("id"),
        message: String::from("must not be empty"),
    }),
    ErrorKind::PluginValidation
)]
#[case::not_found(Error::PluginNotFound { id: String::from("ghost") }, ErrorKind::PluginLoad)]
#[case::discovery(
    Error::Discovery(DiscoveryError::CommandsFailed { details: vec![] }),
    ErrorKind::DeviceDiscovery
)]
#[case::selection(Error::Selection(SelectionError::NoDevices), ErrorKind::DeviceSelection)]
#[case::feature(
    Error::Feature(FeatureError::UnsupportedValue {
        feature: String::from("anc"),
        value: String::from("bogus"),
        allowed: vec![],
    }),
    ErrorKind::FeatureResolution
)]
#[case::connect(
    Error::Transport(TransportError::connect(MAC, "rfcomm channel 15", "refused")),
    ErrorKind::TransportConnect
)]
#[case::send(
    Error::Transport(TransportError::send(MAC, "rfcomm channel 15", "broken pipe")),
    ErrorKind::TransportSend
)]
#[case::timeout(
    Error::Transport(TransportError::timeout(MAC, "rfcomm channel 15", Duration::from_secs(3))),
    ErrorKind::TransportTimeout
)]
fn every_failure_maps_to_one_kind(#[case] error: Error, #[case] expected: ErrorKind) {
    assert_eq!(error.kind(), expected);
}

#[test]
fn ambiguity_lists_every_candidate() {
    let error = SelectionError::Ambiguous {
        candidates: vec![
            summary("alpha", Some("Buds")),
            summary("beta", None),
        ],
    };
    let message = error.to_string();
    assert!(message.contains("88:92:CC:11:22:33 (Buds) via plugin 'alpha'"), "{message}");
    assert!(message.contains("88:92:CC:11:22:33 via plugin 'beta'"), "{message}");
    assert!(message.contains("device hint"), "{message}");
}

#[test]
fn unsupported_value_lists_allowed_labels() {
    let error = FeatureError::UnsupportedValue {
        feature: String::from("anc"),
        value: String::from("bogus"),
        allowed: vec![String::from("off"), String::from("on")],
    };
    assert_eq!(
        error.to_string(),
        "feature 'anc' does not support value 'bogus'; allowed: off, on"
    );
}

#[test]
fn discovery_failure_joins_details() {
    let error = DiscoveryError::CommandsFailed {
        details: vec![
            String::from("bluetoothctl devices -> no default controller"),
            String::from("hcitool con -> no adapter"),
        ],
    };
    assert!(
        error
            .to_string()
            .ends_with("bluetoothctl devices -> no default controller | hcitool con -> no adapter")
    );
}

#[test]
fn kind_names_are_stable() {
    assert_eq!(ErrorKind::TransportConnect.to_string(), "transport_connect");
    assert_eq!(ErrorKind::DeviceSelection.as_str(), "device_selection");
}
