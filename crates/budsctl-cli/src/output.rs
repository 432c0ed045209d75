//! Human-readable rendering of command results.

use std::io::{self, Write};

use budsctl_core::{
    DetectedDevice, FeatureCatalog, ResolvedTarget, SendResult, best_plugin_for_device,
};
use budsctl_plugins::{PluginDocument, PluginSet};

const NO_MATCH: &str = "<no-match>";

/// Writes each plugin followed by its features and value labels.
pub(crate) fn write_plugins<W: Write>(
    out: &mut W,
    plugins: &[&PluginDocument],
) -> io::Result<()> {
    for plugin in plugins {
        writeln!(out, "{}: {}", plugin.id(), plugin.name())?;
        for (feature, spec) in plugin.features() {
            let labels: Vec<&str> = spec.labels().collect();
            writeln!(out, "  {feature}: {}", labels.join(", "))?;
        }
    }
    Ok(())
}

/// Writes one line per device with the first plugin accepting it.
pub(crate) fn write_devices<W: Write>(
    out: &mut W,
    devices: &[DetectedDevice],
    plugins: &PluginSet,
) -> io::Result<()> {
    if devices.is_empty() {
        return writeln!(out, "No Bluetooth devices found");
    }
    for device in devices {
        let matched = best_plugin_for_device(device, plugins).map_or(NO_MATCH, PluginDocument::id);
        writeln!(
            out,
            "{} {} -> {matched}",
            device.mac(),
            device.display_name()
        )?;
    }
    Ok(())
}

pub(crate) fn write_catalog<W: Write>(out: &mut W, catalog: &FeatureCatalog<'_>) -> io::Result<()> {
    write_target(out, catalog.target())?;
    for (feature, values) in catalog.features() {
        writeln!(out, "  {feature}: {}", values.join(", "))?;
    }
    Ok(())
}

pub(crate) fn write_values<W: Write>(
    out: &mut W,
    feature: &str,
    target: &ResolvedTarget<'_>,
    values: &[String],
) -> io::Result<()> {
    writeln!(
        out,
        "Available values for '{feature}' on {} ({}): {}",
        target.device().mac(),
        target.plugin().id(),
        values.join(", ")
    )
}

pub(crate) fn write_sent<W: Write>(out: &mut W, result: &SendResult<'_>) -> io::Result<()> {
    writeln!(
        out,
        "Sent {}={} to {} ({}) payload={}",
        result.feature(),
        result.value(),
        result.target().device().mac(),
        result.target().plugin().id(),
        result.payload_hex()
    )?;
    if let Some(response) = result.response_hex() {
        writeln!(out, "response={response}")?;
    }
    Ok(())
}

fn write_target<W: Write>(out: &mut W, target: &ResolvedTarget<'_>) -> io::Result<()> {
    writeln!(
        out,
        "Target: {} via {}",
        target.device(),
        target.plugin().id()
    )
}
