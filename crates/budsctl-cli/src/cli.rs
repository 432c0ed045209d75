//! Argument definitions for the `budsctl` binary.

use budsctl_core::TargetQuery;
use clap::{Args, Parser, Subcommand};

/// Bluetooth earbuds control through declarative plugin documents.
#[derive(Parser, Debug)]
#[command(name = "budsctl", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Hints narrowing which device and plugin a command acts on.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TargetArgs {
    /// Device address, address prefix, name fragment, or plugin id.
    #[arg(long, value_name = "HINT")]
    pub(crate) device: Option<String>,
    /// Id of the plugin to use.
    #[arg(long, value_name = "ID")]
    pub(crate) plugin: Option<String>,
}

impl TargetArgs {
    pub(crate) fn query(&self) -> TargetQuery {
        let mut query = TargetQuery::new();
        if let Some(plugin) = &self.plugin {
            query = query.with_plugin_id(plugin.as_str());
        }
        if let Some(device) = &self.device {
            query = query.with_device_hint(device.as_str());
        }
        query
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// Lists loaded plugins with their features and values.
    List,
    /// Lists discovered devices and the plugin matching each.
    Devices,
    /// Lists the features and values of the resolved target.
    Features {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Sets a feature to a value. Without VALUE, lists the allowed values.
    Set {
        /// Feature name, e.g. `anc`.
        feature: String,
        /// Value label, e.g. `on`.
        value: Option<String>,
        #[command(flatten)]
        target: TargetArgs,
    },
}
