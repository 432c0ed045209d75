//! Feature and value lookup within a resolved plugin.

use std::collections::BTreeMap;

use budsctl_plugins::{FeatureSpec, Payload, PluginDocument};

use crate::error::FeatureError;
use crate::resolver::ResolvedTarget;

/// Every feature of a target and its value labels, both sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureCatalog<'p> {
    target: ResolvedTarget<'p>,
    features: BTreeMap<String, Vec<String>>,
}

impl<'p> FeatureCatalog<'p> {
    /// Builds the catalog for `target`.
    #[must_use]
    pub fn for_target(target: ResolvedTarget<'p>) -> Self {
        let features = target
            .plugin()
            .features()
            .iter()
            .map(|(name, spec)| (name.clone(), labels(spec)))
            .collect();
        Self { target, features }
    }

    /// Returns the target the catalog describes.
    #[must_use]
    pub const fn target(&self) -> &ResolvedTarget<'p> {
        &self.target
    }

    /// Returns feature names mapped to their value labels.
    #[must_use]
    pub const fn features(&self) -> &BTreeMap<String, Vec<String>> {
        &self.features
    }
}

fn labels(spec: &FeatureSpec) -> Vec<String> {
    spec.labels().map(str::to_owned).collect()
}

fn feature<'p>(plugin: &'p PluginDocument, name: &str) -> Result<&'p FeatureSpec, FeatureError> {
    plugin
        .feature(name)
        .ok_or_else(|| FeatureError::UnknownFeature {
            plugin_id: plugin.id().to_owned(),
            feature: name.to_owned(),
            available: plugin.feature_names().map(str::to_owned).collect(),
        })
}

/// Returns the sorted value labels of `feature_name`.
///
/// # Errors
///
/// Returns [`FeatureError::UnknownFeature`] when the plugin does not define
/// the feature.
pub fn values(plugin: &PluginDocument, feature_name: &str) -> Result<Vec<String>, FeatureError> {
    feature(plugin, feature_name).map(labels)
}

/// Returns the payload for `label` of `feature_name`, exactly as declared.
///
/// # Errors
///
/// Returns [`FeatureError::UnknownFeature`] for an unknown feature and
/// [`FeatureError::UnsupportedValue`] for an unknown label.
pub fn payload<'p>(
    plugin: &'p PluginDocument,
    feature_name: &str,
    label: &str,
) -> Result<&'p Payload, FeatureError> {
    let spec = feature(plugin, feature_name)?;
    spec.payload(label)
        .ok_or_else(|| FeatureError::UnsupportedValue {
            feature: feature_name.to_owned(),
            value: label.to_owned(),
            allowed: labels(spec),
        })
}
