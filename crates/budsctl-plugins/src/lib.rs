//! Declarative plugin documents for `budsctl`.
//!
//! A plugin document describes one earbud model: which discovered devices it
//! applies to, how to reach the device (an RFCOMM channel or a BLE GATT
//! characteristic), and the closed set of feature values it can send. The
//! documents are pure data. Extending device support never requires running
//! third-party code.
//!
//! # Architecture
//!
//! Loading happens in three stages:
//!
//! 1. [`syntax`] parses YAML into an untyped node tree, rejecting duplicate
//!    keys at every nesting level.
//! 2. [`schema`] checks the tree against the closed document schema and the
//!    semantic rules (channel range, UUID shape, payload encoding), producing a
//!    typed [`PluginDocument`].
//! 3. [`registry`] merges built-in and user documents into an immutable
//!    [`PluginSet`], recording override warnings and skipped documents.
//!
//! # Example
//!
//! ```
//! use budsctl_plugins::{PluginSource, load};
//!
//! let source = PluginSource::new(
//!     "inline.yaml",
//!     r#"
//! id: demo
//! name: Demo Buds
//! match:
//!   name_contains: ["Demo"]
//! transport:
//!   type: rfcomm
//!   channel: 12
//! features:
//!   anc:
//!     type: enum
//!     values:
//!       "on": "aa01"
//!       "off": "aa00"
//! "#,
//! );
//!
//! let report = load(&[source], &[]);
//! assert!(report.errors().is_empty());
//! let plugin = report.plugins().get("demo").expect("demo is loaded");
//! assert_eq!(plugin.name(), "Demo Buds");
//! ```

pub mod builtin;
pub mod error;
pub mod model;
pub mod registry;
pub mod schema;
pub mod source;
pub mod syntax;

pub use self::builtin::builtin_sources;
pub use self::error::{PluginError, PluginErrorKind};
pub use self::model::{
    BleConfig, FeatureKind, FeatureSpec, GattUuid, MAX_PAYLOAD_BYTES, MatchRules, Payload,
    PluginDocument, RfcommConfig, TransportConfig, TransportKind, ValueError, to_hex,
};
pub use self::registry::{LoadReport, PluginSet, load, parse_source};
pub use self::source::{PluginSource, read_search_paths, read_sources};
