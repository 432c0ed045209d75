//! Unit tests for the plugin set and loader.

use rstest::{fixture, rstest};

use super::*;
use crate::error::PluginErrorKind;
use crate::model::{FeatureSpec, MatchRules, Payload, RfcommConfig, TransportConfig};

fn document_text(id: &str, name: &str, channel: u8) -> String {
    format!(
        r#"
id: {id}
name: {name}
match:
  name_contains: ["{name}"]
transport:
  type: rfcomm
  channel: {channel}
features:
  anc:
    type: enum
    values:
      "on": "aa01"
      "off": "aa00"
"#
    )
}

fn source(origin: &str, id: &str, name: &str, channel: u8) -> PluginSource {
    PluginSource::new(origin, document_text(id, name, channel))
}

fn make_plugin(id: &str) -> PluginDocument {
    let rules = MatchRules::new(vec![id.to_owned()], vec![]).expect("rules");
    let anc = FeatureSpec::enumeration([("on", Payload::from_hex("01").expect("hex"))])
        .expect("feature");
    PluginDocument::new(id, id, rules, RfcommConfig::new(1).expect("channel").into())
        .with_feature("anc", anc)
}

#[fixture]
fn builtin() -> Vec<PluginSource> {
    vec![
        source("builtin:alpha.yaml", "alpha", "Alpha Buds", 15),
        source("builtin:beta.yaml", "beta", "Beta Buds", 3),
    ]
}

fn channel_of(report: &LoadReport, id: &str) -> u8 {
    match report.plugins().get(id).map(PluginDocument::transport) {
        Some(TransportConfig::Rfcomm(config)) => config.channel(),
        other => panic!("expected rfcomm plugin '{id}', got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// PluginSet
// ---------------------------------------------------------------------------

#[test]
fn new_set_is_empty() {
    let set = PluginSet::new();
    assert!(set.is_empty());
    assert_eq!(set.len(), 0);
}

#[test]
fn register_rejects_duplicate() {
    let mut set = PluginSet::new();
    set.register(make_plugin("rope")).expect("first register");
    let err = set
        .register(make_plugin("rope"))
        .expect_err("duplicate should fail");
    assert!(err.to_string().contains("already registered"));
}

#[test]
fn register_rejects_invalid_document() {
    let rules = MatchRules::new(vec!["x".into()], vec![]).expect("rules");
    let transport = RfcommConfig::new(1).expect("channel").into();
    let plugin = PluginDocument::new("x", "X", rules, transport);
    let mut set = PluginSet::new();
    let err = set.register(plugin).expect_err("features are required");
    assert_eq!(err.kind(), PluginErrorKind::Validation);
    assert!(set.is_empty());
}

#[test]
fn iteration_is_sorted_by_id() {
    let mut set = PluginSet::new();
    for id in ["zeta", "alpha", "mid"] {
        set.register(make_plugin(id)).expect("register");
    }
    assert_eq!(set.ids().collect::<Vec<_>>(), ["alpha", "mid", "zeta"]);
}

// ---------------------------------------------------------------------------
// load
// ---------------------------------------------------------------------------

#[test]
fn load_single_document_yields_exactly_its_id() {
    let report = load(&[source("a.yaml", "solo", "Solo Buds", 5)], &[]);
    assert_eq!(report.plugins().ids().collect::<Vec<_>>(), ["solo"]);
    assert!(report.warnings().is_empty());
    assert!(report.errors().is_empty());
}

#[rstest]
fn user_document_replaces_builtin(builtin: Vec<PluginSource>) {
    let user = [source("/home/u/alpha.yaml", "alpha", "User Alpha", 16)];
    let report = load(&builtin, &user);

    let expected =
        parse_source(user.first().expect("user source")).expect("user document is valid");
    assert_eq!(report.plugins().get("alpha"), Some(&expected));
    assert_eq!(channel_of(&report, "alpha"), 16);
    assert_eq!(channel_of(&report, "beta"), 3);

    let mentioning: Vec<&String> = report
        .warnings()
        .iter()
        .filter(|warning| warning.contains("'alpha'"))
        .collect();
    assert_eq!(mentioning.len(), 1, "warnings: {:?}", report.warnings());
    assert_eq!(report.warnings().len(), 1);
    let warning = mentioning.first().expect("one warning");
    assert!(warning.contains("/home/u/alpha.yaml"));
    assert!(warning.contains("overrides"));
}

#[rstest]
fn override_is_whole_document(builtin: Vec<PluginSource>) {
    let user_text = r#"
id: alpha
name: Sparse Alpha
match:
  mac_prefix: ["AA:BB"]
transport:
  type: rfcomm
  channel: 9
features:
  eq:
    type: enum
    values:
      bass: "0b"
"#;
    let report = load(&builtin, &[PluginSource::new("user.yaml", user_text)]);
    let plugin = report.plugins().get("alpha").expect("alpha present");
    assert!(plugin.feature("anc").is_none(), "built-in features must not leak");
    assert!(plugin.match_rules().name_contains().is_empty());
    assert_eq!(plugin.feature_names().collect::<Vec<_>>(), ["eq"]);
}

#[test]
fn later_user_paths_win() {
    let user = [
        source("/cfg/dup.yaml", "dup", "First", 1),
        source("/data/dup.yaml", "dup", "Second", 2),
    ];
    let report = load(&[], &user);
    assert_eq!(channel_of(&report, "dup"), 2);
    assert_eq!(report.warnings().len(), 1);
    let warning = report.warnings().first().expect("warning");
    assert!(warning.contains("/data/dup.yaml"));
    assert!(warning.contains("/cfg/dup.yaml"));
}

#[rstest]
#[case::duplicate_key(
    "id: dup\nid: again\n",
    PluginErrorKind::Load
)]
#[case::bad_hex(
    "id: bad\nname: Bad\nmatch:\n  name_contains: [\"Bad\"]\ntransport:\n  type: rfcomm\n  channel: 15\nfeatures:\n  anc:\n    type: enum\n    values:\n      \"on\": \"xyz\"\n",
    PluginErrorKind::Validation
)]
#[case::missing_features(
    "id: missing\nname: Missing\nmatch:\n  name_contains: [\"Missing\"]\ntransport:\n  type: rfcomm\n  channel: 1\n",
    PluginErrorKind::Validation
)]
fn invalid_documents_are_skipped(
    builtin: Vec<PluginSource>,
    #[case] text: &str,
    #[case] expected: PluginErrorKind,
) {
    let report = load(&builtin, &[PluginSource::new("broken.yaml", text)]);

    assert_eq!(report.plugins().ids().collect::<Vec<_>>(), ["alpha", "beta"]);
    assert_eq!(report.errors().len(), 1);
    let error = report.errors().first().expect("one error");
    assert_eq!(error.kind(), expected);
    assert_eq!(error.origin(), "broken.yaml");
    assert!(
        report
            .warnings()
            .iter()
            .any(|warning| warning.contains("broken.yaml"))
    );
}

#[test]
fn duplicate_key_document_does_not_touch_existing_plugin() {
    let builtin = [source("builtin:dup.yaml", "dup", "Built In", 4)];
    let broken = document_text("dup", "Broken", 7).replace(
        "\"off\": \"aa00\"",
        "\"off\": \"aa00\"\n      \"off\": \"aa02\"",
    );
    let report = load(&builtin, &[PluginSource::new("dup.yaml", broken)]);

    assert_eq!(channel_of(&report, "dup"), 4);
    let error = report.errors().first().expect("duplicate key error");
    assert_eq!(error.kind(), PluginErrorKind::Load);
}

#[test]
fn load_is_repeatable() {
    let sources = [source("a.yaml", "a", "A Buds", 1)];
    assert_eq!(load(&sources, &[]).plugins(), load(&sources, &[]).plugins());
}
