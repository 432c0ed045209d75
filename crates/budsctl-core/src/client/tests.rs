//! Unit tests for the client façade.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;
use std::time::Duration;

use budsctl_plugins::PluginSource;
use budsctl_transport::{TransportError, TransportErrorKind};
use mockall::mock;
use rstest::{fixture, rstest};

use super::*;
use crate::error::{DiscoveryError, ErrorKind};

mock! {
    Discovery {}
    impl Discovery for Discovery {
        fn discover(&self) -> Result<Vec<DetectedDevice>, DiscoveryError>;
    }
}

const BUDS_MAC: &str = "88:92:CC:11:22:33";
const BAND_MAC: &str = "C0:FF:EE:00:11:22";

const RFCOMM_PLUGIN: &str = r#"
id: rfcomm_buds
name: Rfcomm Buds
match:
  name_contains: ["Rfcomm Buds"]
transport:
  type: rfcomm
  channel: 15
features:
  anc:
    type: enum
    values:
      "on": "aa01"
      "off": "aa00"
"#;

const BLE_PLUGIN: &str = r#"
id: ble_band
name: BLE Band
match:
  mac_prefix: ["C0:FF:EE"]
transport:
  type: ble
  service_uuid: "fe2c"
  write_char_uuid: "fe2d"
  notify_char_uuid: "fe2e"
features:
  light:
    type: enum
    values:
      dim: "0b01"
"#;

type SendLog = Rc<RefCell<Vec<(String, Vec<u8>)>>>;

/// Records every send and answers with a fixed outcome.
struct RecordingTransport<C> {
    log: SendLog,
    outcome: Result<Option<Vec<u8>>, TransportError>,
    unavailable: Option<&'static str>,
    _config: PhantomData<C>,
}

impl<C> RecordingTransport<C> {
    fn replying(reply: Option<Vec<u8>>) -> (Self, SendLog) {
        Self::with_outcome(Ok(reply))
    }

    fn with_outcome(outcome: Result<Option<Vec<u8>>, TransportError>) -> (Self, SendLog) {
        let log = SendLog::default();
        let transport = Self {
            log: Rc::clone(&log),
            outcome,
            unavailable: None,
            _config: PhantomData,
        };
        (transport, log)
    }
}

impl<C> Transport for RecordingTransport<C> {
    type Config = C;

    fn send(
        &self,
        mac: &str,
        payload: &[u8],
        _config: &C,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        self.log
            .borrow_mut()
            .push((mac.to_owned(), payload.to_vec()));
        self.outcome.clone()
    }

    fn unavailable_reason(&self) -> Option<&'static str> {
        self.unavailable
    }
}

fn device(mac: &str, name: &str) -> DetectedDevice {
    DetectedDevice::named(mac.parse().expect("valid address"), name)
}

#[fixture]
fn report() -> LoadReport {
    let report = load(
        &[
            PluginSource::new("rfcomm.yaml", RFCOMM_PLUGIN),
            PluginSource::new("ble.yaml", BLE_PLUGIN),
        ],
        &[],
    );
    assert!(report.errors().is_empty(), "{:?}", report.errors());
    report
}

fn discovering(devices: Vec<DetectedDevice>) -> MockDiscovery {
    let mut discovery = MockDiscovery::new();
    discovery
        .expect_discover()
        .returning(move || Ok(devices.clone()));
    discovery
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[rstest]
fn rfcomm_plugin_sends_declared_payload(report: LoadReport) {
    let (rfcomm, rfcomm_log) = RecordingTransport::<RfcommConfig>::replying(Some(vec![0xaa, 0x00]));
    let (ble, ble_log) = RecordingTransport::<BleConfig>::replying(None);
    let client = Client::builder()
        .plugins(report)
        .rfcomm(rfcomm)
        .ble(ble)
        .discovery(discovering(vec![device(BUDS_MAC, "Rfcomm Buds Pro")]))
        .build();

    let result = client
        .set_feature("anc", "on", &TargetQuery::new())
        .expect("send succeeds");

    assert_eq!(result.target().plugin().id(), "rfcomm_buds");
    assert_eq!(result.feature(), "anc");
    assert_eq!(result.value(), "on");
    assert_eq!(result.payload_hex(), "aa01");
    assert_eq!(result.response_hex().as_deref(), Some("aa00"));
    assert_eq!(
        rfcomm_log.borrow().as_slice(),
        &[(String::from(BUDS_MAC), vec![0xaa, 0x01])]
    );
    assert!(ble_log.borrow().is_empty());
}

#[rstest]
fn ble_plugin_uses_gatt_transport(report: LoadReport) {
    let (rfcomm, rfcomm_log) = RecordingTransport::<RfcommConfig>::replying(None);
    let (ble, ble_log) = RecordingTransport::<BleConfig>::replying(None);
    let client = Client::builder()
        .plugins(report)
        .rfcomm(rfcomm)
        .ble(ble)
        .discovery(discovering(vec![device(BAND_MAC, "Band")]))
        .build();

    let result = client
        .set_feature("light", "dim", &TargetQuery::new())
        .expect("send succeeds");

    assert_eq!(result.response(), None);
    assert_eq!(result.response_hex(), None);
    assert_eq!(ble_log.borrow().len(), 1);
    assert!(rfcomm_log.borrow().is_empty());
}

#[rstest]
fn unsupported_value_never_reaches_transport(report: LoadReport) {
    let (rfcomm, rfcomm_log) = RecordingTransport::<RfcommConfig>::replying(None);
    let client = Client::builder()
        .plugins(report)
        .rfcomm(rfcomm)
        .ble(RecordingTransport::<BleConfig>::replying(None).0)
        .discovery(discovering(vec![device(BUDS_MAC, "Rfcomm Buds")]))
        .build();

    let error = client
        .set_feature("anc", "loud", &TargetQuery::new())
        .expect_err("value is not declared");

    assert_eq!(error.kind(), ErrorKind::FeatureResolution);
    assert!(error.to_string().contains("allowed: off, on"), "{error}");
    assert!(rfcomm_log.borrow().is_empty());
}

#[rstest]
fn transport_failures_surface_verbatim(report: LoadReport) {
    let failure = TransportError::timeout(BUDS_MAC, "rfcomm channel 15", Duration::from_secs(3));
    let (rfcomm, rfcomm_log) =
        RecordingTransport::<RfcommConfig>::with_outcome(Err(failure.clone()));
    let client = Client::builder()
        .plugins(report)
        .rfcomm(rfcomm)
        .ble(RecordingTransport::<BleConfig>::replying(None).0)
        .discovery(discovering(vec![device(BUDS_MAC, "Rfcomm Buds")]))
        .build();

    let error = client
        .set_feature("anc", "off", &TargetQuery::new())
        .expect_err("transport times out");

    assert_eq!(error.kind(), ErrorKind::TransportTimeout);
    assert_eq!(error.to_string(), failure.to_string());
    assert_eq!(rfcomm_log.borrow().len(), 1, "no retry");
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[rstest]
fn feature_values_are_sorted(report: LoadReport) {
    let client = Client::builder()
        .plugins(report)
        .discovery(discovering(vec![device(BUDS_MAC, "Rfcomm Buds")]))
        .build();

    let (target, values) = client
        .feature_values("anc", &TargetQuery::new())
        .expect("feature exists");

    assert_eq!(target.device().mac().to_string(), BUDS_MAC);
    assert_eq!(values, vec![String::from("off"), String::from("on")]);
}

#[rstest]
fn unknown_feature_lists_available_ones(report: LoadReport) {
    let client = Client::builder()
        .plugins(report)
        .discovery(discovering(vec![device(BUDS_MAC, "Rfcomm Buds")]))
        .build();

    let error = client
        .feature_values("eq", &TargetQuery::new())
        .expect_err("feature is not declared");

    assert_eq!(error.kind(), ErrorKind::FeatureResolution);
    assert!(error.to_string().contains("available: anc"), "{error}");
}

#[rstest]
fn discovery_failure_is_reported(report: LoadReport) {
    let mut discovery = MockDiscovery::new();
    discovery.expect_discover().times(1).returning(|| {
        Err(DiscoveryError::CommandsFailed {
            details: vec![String::from("bluetoothctl devices -> no controller")],
        })
    });
    let client = Client::builder().plugins(report).discovery(discovery).build();

    let error = client
        .resolve_target(&TargetQuery::new())
        .expect_err("discovery fails");

    assert_eq!(error.kind(), ErrorKind::DeviceDiscovery);
}

#[rstest]
fn unknown_plugin_id_is_a_load_error(report: LoadReport) {
    let client = Client::builder()
        .plugins(report)
        .discovery(discovering(vec![device(BUDS_MAC, "Rfcomm Buds")]))
        .build();

    let error = client
        .resolve_target(&TargetQuery::new().with_plugin_id("ghost"))
        .expect_err("plugin is unknown");

    assert_eq!(error.kind(), ErrorKind::PluginLoad);
    assert!(matches!(error, Error::PluginNotFound { ref id } if id == "ghost"));
}

#[rstest]
fn list_plugins_is_sorted_by_id(report: LoadReport) {
    let client = Client::builder().plugins(report).discovery(discovering(vec![])).build();
    let ids: Vec<&str> = client
        .list_plugins()
        .into_iter()
        .map(PluginDocument::id)
        .collect();
    assert_eq!(ids, vec!["ble_band", "rfcomm_buds"]);
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn default_builder_loads_builtin_plugins() {
    let client = Client::builder().discovery(discovering(vec![])).build();
    assert!(client.plugins().contains("oneplus_buds4"));
    assert!(client.load_warnings().is_empty());
    assert!(client.load_errors().is_empty());
}

#[test]
fn unavailable_transports_become_runtime_warnings() {
    let (mut ble, _log) = RecordingTransport::<BleConfig>::replying(None);
    ble.unavailable = Some("BLE GATT support is not compiled in");
    let client = Client::builder()
        .rfcomm(RecordingTransport::<RfcommConfig>::replying(None).0)
        .ble(ble)
        .discovery(discovering(vec![]))
        .build();

    assert_eq!(
        client.runtime_warnings(),
        &[String::from(
            "BLE GATT support is not compiled in; ble plugins cannot be controlled"
        )]
    );
}

#[test]
fn skipped_documents_are_kept_as_load_errors() {
    let report = load(
        &builtin_sources(),
        &[PluginSource::new("broken.yaml", "id: [unterminated")],
    );
    let client = Client::builder().plugins(report).discovery(discovering(vec![])).build();

    assert_eq!(client.load_errors().len(), 1);
    assert!(
        client
            .load_warnings()
            .iter()
            .any(|warning| warning.starts_with("Skipping plugin broken.yaml"))
    );
}

#[test]
fn transport_error_kind_is_preserved() {
    let error = Error::from(TransportError::connect(BUDS_MAC, "rfcomm channel 15", "refused"));
    assert!(matches!(
        error,
        Error::Transport(ref inner) if inner.kind() == TransportErrorKind::Connect
    ));
}
