//! Merged plugin set and the loader that builds it.
//!
//! [`load`] parses built-in sources first and user sources second. A user
//! document whose id collides with an earlier document replaces it whole and
//! records a warning; an invalid document is skipped and recorded as an
//! error so the remaining documents stay usable. The resulting [`PluginSet`]
//! is immutable and ordered by id.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::PluginError;
use crate::model::PluginDocument;
use crate::schema;
use crate::source::PluginSource;
use crate::syntax;

const REGISTRY_TARGET: &str = "budsctl_plugins::registry";

/// Plugin documents keyed by id, iterated in id order.
///
/// # Example
///
/// ```
/// use budsctl_plugins::{
///     FeatureSpec, MatchRules, Payload, PluginDocument, PluginSet, RfcommConfig,
/// };
///
/// let rules = MatchRules::new(vec!["Demo".into()], vec![]).expect("rules");
/// let anc = FeatureSpec::enumeration([("on", Payload::from_hex("01").expect("hex"))])
///     .expect("feature");
/// let plugin = PluginDocument::new(
///     "demo",
///     "Demo Buds",
///     rules,
///     RfcommConfig::new(1).expect("channel").into(),
/// )
/// .with_feature("anc", anc);
///
/// let mut set = PluginSet::new();
/// set.register(plugin).expect("registration succeeds");
/// assert!(set.get("demo").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginSet {
    plugins: BTreeMap<String, PluginDocument>,
}

impl PluginSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin document after validation.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Validation`] if validation fails or a plugin
    /// with the same id is already registered.
    pub fn register(&mut self, plugin: PluginDocument) -> Result<(), PluginError> {
        plugin.validate()?;
        let id = plugin.id().to_owned();
        if self.plugins.contains_key(&id) {
            return Err(PluginError::Validation {
                origin: format!("plugin '{id}'"),
                path: String::from("id"),
                message: format!("plugin '{id}' is already registered"),
            });
        }
        self.plugins.insert(id, plugin);
        Ok(())
    }

    fn replace(&mut self, plugin: PluginDocument) -> Option<PluginDocument> {
        self.plugins.insert(plugin.id().to_owned(), plugin)
    }

    /// Looks up a plugin by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PluginDocument> {
        self.plugins.get(id)
    }

    /// Returns `true` if a plugin with this id is present.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.plugins.contains_key(id)
    }

    /// Iterates over plugins in id order.
    pub fn iter(&self) -> impl Iterator<Item = &PluginDocument> {
        self.plugins.values()
    }

    /// Iterates over plugin ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    /// Returns the number of plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` when the set holds no plugins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl<'a> IntoIterator for &'a PluginSet {
    type Item = &'a PluginDocument;
    type IntoIter = std::collections::btree_map::Values<'a, String, PluginDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.plugins.values()
    }
}

/// Outcome of [`load`]: the merged set plus what was overridden or skipped.
#[derive(Debug, Default)]
pub struct LoadReport {
    plugins: PluginSet,
    warnings: Vec<String>,
    errors: Vec<PluginError>,
}

impl LoadReport {
    /// Wraps an already-built set with no warnings or errors.
    #[must_use]
    pub fn from_plugins(plugins: PluginSet) -> Self {
        Self {
            plugins,
            ..Self::default()
        }
    }

    /// Returns the merged plugin set.
    #[must_use]
    pub const fn plugins(&self) -> &PluginSet {
        &self.plugins
    }

    /// Returns override notices and skipped-document summaries, in order.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Returns one error per skipped document.
    #[must_use]
    pub fn errors(&self) -> &[PluginError] {
        &self.errors
    }

    /// Splits the report into its parts.
    #[must_use]
    pub fn into_parts(self) -> (PluginSet, Vec<String>, Vec<PluginError>) {
        (self.plugins, self.warnings, self.errors)
    }

    fn absorb(&mut self, source: &PluginSource, origins: &mut BTreeMap<String, String>) {
        let plugin = match parse_source(source) {
            Ok(plugin) => plugin,
            Err(error) => {
                warn!(
                    target: REGISTRY_TARGET,
                    origin = source.origin(),
                    error = %error,
                    "skipping invalid plugin document"
                );
                self.warnings
                    .push(format!("Skipping plugin {}: {error}", source.origin()));
                self.errors.push(error);
                return;
            }
        };

        let id = plugin.id().to_owned();
        if let Some(previous) = origins.insert(id.clone(), source.origin().to_owned()) {
            let message = format!(
                "Plugin '{id}' from {} overrides the one from {previous}",
                source.origin()
            );
            warn!(target: REGISTRY_TARGET, plugin = %id, origin = source.origin(), "{message}");
            self.warnings.push(message);
        } else {
            debug!(
                target: REGISTRY_TARGET,
                plugin = %id,
                origin = source.origin(),
                "loaded plugin"
            );
        }
        self.plugins.replace(plugin);
    }
}

/// Parses and validates a single source.
///
/// # Errors
///
/// Returns a load-kind [`PluginError`] when the source is unreadable or not
/// well-formed, and a validation-kind error when it breaks the schema.
pub fn parse_source(source: &PluginSource) -> Result<PluginDocument, PluginError> {
    let text = source.text()?;
    let root = syntax::parse(source.origin(), text)?;
    schema::document(source.origin(), &root)
}

/// Loads built-in sources, then user sources, into a merged set.
///
/// Later sources win on id collision; each collision produces exactly one
/// warning naming the id and both origins. Invalid sources are skipped and
/// reported through [`LoadReport::errors`].
#[must_use]
pub fn load(builtin: &[PluginSource], user: &[PluginSource]) -> LoadReport {
    let mut report = LoadReport::default();
    let mut origins = BTreeMap::new();
    for source in builtin.iter().chain(user) {
        report.absorb(source, &mut origins);
    }
    debug!(
        target: REGISTRY_TARGET,
        plugins = report.plugins.len(),
        warnings = report.warnings.len(),
        errors = report.errors.len(),
        "plugin load complete"
    );
    report
}

#[cfg(test)]
mod tests;
