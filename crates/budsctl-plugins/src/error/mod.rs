//! Domain errors raised while loading plugin documents.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! to satisfy the `result_large_err` Clippy lint.

use std::sync::Arc;

use thiserror::Error;

/// Broad classification of a [`PluginError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginErrorKind {
    /// The document could not be read or parsed at all.
    Load,
    /// The document parsed but violates the schema or a semantic rule.
    Validation,
}

/// Errors arising while reading, parsing, or validating a plugin document.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin source could not be read from disk.
    #[error("could not read plugin file {origin}: {source}")]
    Read {
        /// Path or label identifying the source.
        origin: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The document is not well-formed YAML.
    #[error("invalid YAML in {origin}: {message}")]
    Syntax {
        /// Path or label identifying the source.
        origin: String,
        /// Parser diagnostic, including the location when known.
        message: String,
    },

    /// A mapping key appears more than once at the same nesting level.
    #[error("duplicate key '{key}' at {path} in {origin}")]
    DuplicateKey {
        /// Path or label identifying the source.
        origin: String,
        /// Dotted path of the mapping holding the duplicate (`<root>` for the
        /// top level).
        path: String,
        /// The repeated key.
        key: String,
    },

    /// The document root is not a mapping.
    #[error("plugin file {origin} must contain a mapping at root")]
    NotAMapping {
        /// Path or label identifying the source.
        origin: String,
    },

    /// The document violates the schema or a semantic rule.
    #[error("invalid plugin {origin} ({path}): {message}")]
    Validation {
        /// Path or label identifying the source.
        origin: String,
        /// Dotted path of the offending field.
        path: String,
        /// Description of the violation.
        message: String,
    },
}

impl PluginError {
    /// Returns whether this is a load failure or a validation failure.
    #[must_use]
    pub const fn kind(&self) -> PluginErrorKind {
        match self {
            Self::Read { .. }
            | Self::Syntax { .. }
            | Self::DuplicateKey { .. }
            | Self::NotAMapping { .. } => PluginErrorKind::Load,
            Self::Validation { .. } => PluginErrorKind::Validation,
        }
    }

    /// Returns the path or label of the source the error refers to.
    #[must_use]
    pub fn origin(&self) -> &str {
        match self {
            Self::Read { origin, .. }
            | Self::Syntax { origin, .. }
            | Self::DuplicateKey { origin, .. }
            | Self::NotAMapping { origin }
            | Self::Validation { origin, .. } => origin,
        }
    }
}
