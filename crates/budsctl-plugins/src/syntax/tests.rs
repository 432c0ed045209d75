//! Unit tests for YAML node parsing.

use rstest::rstest;

use super::*;
use crate::error::PluginErrorKind;

fn string(value: &str) -> Node {
    Node::String(value.to_owned())
}

#[test]
fn parses_nested_mapping_in_document_order() {
    let root = parse("inline", "b: 1\na:\n  c: x\n").expect("valid document");
    assert_eq!(
        root,
        Node::Mapping(vec![
            ("b".into(), Node::Integer(1)),
            ("a".into(), Node::Mapping(vec![("c".into(), string("x"))])),
        ])
    );
}

#[test]
fn keys_are_strings_even_when_boolean_like() {
    let root = parse("inline", "values:\n  on: \"aa01\"\n  off: \"aa00\"\n")
        .expect("valid document");
    let Node::Mapping(entries) = root else {
        panic!("root should be a mapping");
    };
    let Some((_, Node::Mapping(values))) = entries.first() else {
        panic!("values should be a mapping");
    };
    let keys: Vec<&str> = values.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, ["on", "off"]);
}

#[rstest]
#[case::scalar("just a string\n")]
#[case::sequence("- a\n- b\n")]
fn rejects_non_mapping_root(#[case] text: &str) {
    let error = parse("root.yaml", text).expect_err("root must be a mapping");
    assert!(matches!(error, PluginError::NotAMapping { .. }));
    assert_eq!(error.kind(), PluginErrorKind::Load);
}

#[test]
fn rejects_malformed_yaml() {
    let error = parse("broken.yaml", "id: [unclosed\n").expect_err("malformed YAML");
    assert_eq!(error.kind(), PluginErrorKind::Load);
    assert_eq!(error.origin(), "broken.yaml");
}

#[rstest]
#[case::top_level("id: a\nid: b\n")]
#[case::nested("features:\n  anc:\n    values:\n      \"on\": \"01\"\n      \"on\": \"02\"\n")]
fn rejects_duplicate_keys_as_load_errors(#[case] text: &str) {
    let error = parse("dup.yaml", text).expect_err("duplicate keys are rejected");
    assert_eq!(error.kind(), PluginErrorKind::Load);
    assert!(
        matches!(
            error,
            PluginError::DuplicateKey { .. } | PluginError::Syntax { .. }
        ),
        "unexpected error: {error:?}"
    );
}

#[test]
fn duplicate_search_reports_nested_path() {
    let tree = Node::Mapping(vec![(
        "features".into(),
        Node::Mapping(vec![(
            "anc".into(),
            Node::Mapping(vec![(
                "values".into(),
                Node::Mapping(vec![
                    ("on".into(), string("01")),
                    ("on".into(), string("02")),
                ]),
            )]),
        )]),
    )]);

    assert_eq!(
        find_duplicate_key(&tree, ROOT_PATH),
        Some(("features.anc.values".into(), "on".into()))
    );
}

#[test]
fn duplicate_search_reports_root_path() {
    let tree = Node::Mapping(vec![("id".into(), string("a")), ("id".into(), string("b"))]);
    assert_eq!(
        find_duplicate_key(&tree, ROOT_PATH),
        Some((ROOT_PATH.into(), "id".into()))
    );
}

#[test]
fn duplicate_search_descends_into_sequences() {
    let tree = Node::Mapping(vec![(
        "items".into(),
        Node::Sequence(vec![Node::Mapping(vec![
            ("k".into(), Node::Null),
            ("k".into(), Node::Null),
        ])]),
    )]);
    assert_eq!(
        find_duplicate_key(&tree, ROOT_PATH),
        Some(("items[0]".into(), "k".into()))
    );
}

#[rstest]
#[case::root(ROOT_PATH, "id", "id")]
#[case::nested("transport", "channel", "transport.channel")]
fn join_path_builds_dotted_paths(
    #[case] parent: &str,
    #[case] child: &str,
    #[case] expected: &str,
) {
    assert_eq!(join_path(parent, child), expected);
}
