//! YAML parsing into an untyped node tree.
//!
//! Plugin documents are first parsed into [`Node`]s rather than directly into
//! typed structs. Mappings keep every entry in document order, so a key that
//! appears twice at the same nesting level is detected and reported with its
//! dotted path instead of silently overwriting the earlier entry. Mapping keys
//! are always read as strings, which keeps labels such as `on` and `off` from
//! being coerced into booleans.

use std::collections::BTreeSet;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

use crate::error::PluginError;

/// Path label used for the document root in diagnostics.
pub const ROOT_PATH: &str = "<root>";

/// An untyped YAML value.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `null` or `~`.
    Null,
    /// A boolean scalar.
    Bool(bool),
    /// An integer scalar.
    Integer(i128),
    /// A floating-point scalar.
    Float(f64),
    /// A string scalar.
    String(String),
    /// A sequence of nodes.
    Sequence(Vec<Node>),
    /// A mapping, in document order, possibly with repeated keys.
    Mapping(Vec<(String, Node)>),
}

impl Node {
    /// Returns a short description of the node type for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "number",
            Self::String(_) => "string",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("any YAML value")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Node, E> {
        Ok(Node::Bool(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Node, E> {
        Ok(Node::Integer(i128::from(value)))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Node, E> {
        Ok(Node::Integer(i128::from(value)))
    }

    fn visit_i128<E: de::Error>(self, value: i128) -> Result<Node, E> {
        Ok(Node::Integer(value))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Node, E> {
        Ok(Node::Float(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Node, E> {
        Ok(Node::String(value.to_owned()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Node, E> {
        Ok(Node::String(value))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Node, D::Error>
    where
        D: Deserializer<'de>,
    {
        Node::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Node, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Node>()? {
            items.push(item);
        }
        Ok(Node::Sequence(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Node, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value::<Node>()?;
            entries.push((key, value));
        }
        Ok(Node::Mapping(entries))
    }
}

/// Parses `text` into a node tree whose root is a mapping.
///
/// `origin` labels the source in diagnostics (a file path or a
/// `builtin:` label).
///
/// # Errors
///
/// Returns [`PluginError::Syntax`] for malformed YAML,
/// [`PluginError::DuplicateKey`] when a mapping repeats a key, and
/// [`PluginError::NotAMapping`] when the root is anything but a mapping.
///
/// # Example
///
/// ```
/// use budsctl_plugins::syntax::{Node, parse};
///
/// let root = parse("inline", "id: demo\n").expect("valid document");
/// assert_eq!(
///     root,
///     Node::Mapping(vec![("id".into(), Node::String("demo".into()))])
/// );
/// ```
pub fn parse(origin: &str, text: &str) -> Result<Node, PluginError> {
    let root: Node = serde_saphyr::from_str(text).map_err(|err| PluginError::Syntax {
        origin: origin.to_owned(),
        message: err.to_string(),
    })?;

    if !matches!(root, Node::Mapping(_)) {
        return Err(PluginError::NotAMapping {
            origin: origin.to_owned(),
        });
    }

    if let Some((path, key)) = find_duplicate_key(&root, ROOT_PATH) {
        return Err(PluginError::DuplicateKey {
            origin: origin.to_owned(),
            path,
            key,
        });
    }

    Ok(root)
}

/// Joins a parent path and a child segment with `.`.
#[must_use]
pub fn join_path(parent: &str, child: &str) -> String {
    if parent == ROOT_PATH || parent.is_empty() {
        child.to_owned()
    } else {
        format!("{parent}.{child}")
    }
}

fn find_duplicate_key(node: &Node, path: &str) -> Option<(String, String)> {
    match node {
        Node::Mapping(entries) => {
            let mut seen = BTreeSet::new();
            for (key, _) in entries {
                if !seen.insert(key.as_str()) {
                    return Some((path.to_owned(), key.clone()));
                }
            }
            entries
                .iter()
                .find_map(|(key, child)| find_duplicate_key(child, &join_path(path, key)))
        }
        Node::Sequence(items) => items
            .iter()
            .enumerate()
            .find_map(|(index, child)| find_duplicate_key(child, &format!("{path}[{index}]"))),
        Node::Null | Node::Bool(_) | Node::Integer(_) | Node::Float(_) | Node::String(_) => None,
    }
}

#[cfg(test)]
mod tests;
