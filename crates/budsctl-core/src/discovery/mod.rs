//! Device discovery collaborators.
//!
//! The core only consumes a list of [`DetectedDevice`]s. [`BluetoothctlDiscovery`]
//! builds that list from the `BlueZ` command-line tools; [`StaticDiscovery`]
//! returns a fixed list for hosts that discover devices themselves.

use std::collections::BTreeSet;
use std::io;
use std::process::Command;

use tracing::debug;

use crate::device::{DetectedDevice, MacAddress};
use crate::error::DiscoveryError;

const DISCOVERY_TARGET: &str = "budsctl_core::discovery";

/// Commands tried in order; their device lists are merged.
const BLUETOOTHCTL_COMMANDS: &[&[&str]] = &[
    &["bluetoothctl", "devices", "Connected"],
    &["bluetoothctl", "devices"],
    &["bluetoothctl", "paired-devices"],
];

/// Fallback used only when no `bluetoothctl` command found a device.
const FALLBACK_COMMANDS: &[&[&str]] = &[&["hcitool", "con"]];

/// Source of discovered devices.
pub trait Discovery {
    /// Lists devices, connected ones first where the source knows.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] when the source fails outright. An empty
    /// list is not an error.
    fn discover(&self) -> Result<Vec<DetectedDevice>, DiscoveryError>;
}

/// Discovery returning a fixed list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticDiscovery {
    devices: Vec<DetectedDevice>,
}

impl StaticDiscovery {
    /// Creates discovery that always reports `devices`.
    #[must_use]
    pub const fn new(devices: Vec<DetectedDevice>) -> Self {
        Self { devices }
    }
}

impl Discovery for StaticDiscovery {
    fn discover(&self) -> Result<Vec<DetectedDevice>, DiscoveryError> {
        Ok(self.devices.clone())
    }
}

/// Captured result of one finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the command exited successfully.
    pub success: bool,
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

/// Runs external commands for discovery.
///
/// The production implementation is [`SystemCommandRunner`]; tests supply
/// canned output instead.
pub trait CommandRunner {
    /// Runs `program` with `args` to completion.
    ///
    /// # Errors
    ///
    /// Returns the spawn error, e.g. [`io::ErrorKind::NotFound`] when the
    /// program is not installed.
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput>;
}

/// Runs commands with [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Discovers devices through `bluetoothctl`, falling back to `hcitool`.
///
/// Devices are de-duplicated by address; the first report wins. Missing
/// programs are skipped. When every command failed and nothing was found,
/// the collected stderr output is returned as a [`DiscoveryError`].
#[derive(Debug, Clone, Default)]
pub struct BluetoothctlDiscovery<R = SystemCommandRunner> {
    runner: R,
}

impl BluetoothctlDiscovery {
    /// Creates discovery that runs the real system tools.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R> BluetoothctlDiscovery<R> {
    /// Creates discovery that runs commands through `runner`.
    #[must_use]
    pub const fn with_runner(runner: R) -> Self {
        Self { runner }
    }
}

/// Accumulates devices and failures across commands.
#[derive(Debug, Default)]
struct Sweep {
    seen: BTreeSet<MacAddress>,
    devices: Vec<DetectedDevice>,
    failures: Vec<String>,
}

impl Sweep {
    fn push(&mut self, device: DetectedDevice) {
        if self.seen.insert(device.mac()) {
            self.devices.push(device);
        }
    }
}

impl<R: CommandRunner> BluetoothctlDiscovery<R> {
    fn run_all(
        &self,
        commands: &[&[&str]],
        parse: fn(&str) -> Option<DetectedDevice>,
        sweep: &mut Sweep,
    ) {
        for command in commands {
            let Some((program, args)) = command.split_first() else {
                continue;
            };
            let line = command.join(" ");
            let output = match self.runner.run(program, args) {
                Ok(output) => output,
                Err(error) if error.kind() == io::ErrorKind::NotFound => {
                    debug!(target: DISCOVERY_TARGET, command = %line, "program not installed");
                    continue;
                }
                Err(error) => {
                    sweep.failures.push(format!("{line} -> {error}"));
                    continue;
                }
            };
            if !output.success {
                let stderr = output.stderr.trim();
                if !stderr.is_empty() {
                    sweep.failures.push(format!("{line} -> {stderr}"));
                }
                continue;
            }
            let before = sweep.devices.len();
            for device in output.stdout.lines().filter_map(parse) {
                sweep.push(device);
            }
            debug!(
                target: DISCOVERY_TARGET,
                command = %line,
                added = sweep.devices.len() - before,
                "discovery command finished"
            );
        }
    }
}

impl<R: CommandRunner> Discovery for BluetoothctlDiscovery<R> {
    fn discover(&self) -> Result<Vec<DetectedDevice>, DiscoveryError> {
        let mut sweep = Sweep::default();
        self.run_all(BLUETOOTHCTL_COMMANDS, parse_device_line, &mut sweep);
        if sweep.devices.is_empty() {
            self.run_all(FALLBACK_COMMANDS, parse_connection_line, &mut sweep);
        }
        if sweep.devices.is_empty() && !sweep.failures.is_empty() {
            return Err(DiscoveryError::CommandsFailed {
                details: sweep.failures,
            });
        }
        Ok(sweep.devices)
    }
}

/// Parses a `bluetoothctl` line of the form `Device <MAC> <name>`.
#[must_use]
pub fn parse_device_line(line: &str) -> Option<DetectedDevice> {
    let rest = line.trim().strip_prefix("Device")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let trimmed = rest.trim_start();
    let (mac_text, name) = trimmed
        .split_once(char::is_whitespace)
        .unwrap_or((trimmed, ""));
    let mac = mac_text.parse().ok()?;
    Some(DetectedDevice::new(mac, Some(name.to_owned())))
}

/// Extracts the first address on an `hcitool con` line. Names are unknown.
#[must_use]
pub fn parse_connection_line(line: &str) -> Option<DetectedDevice> {
    line.split_whitespace()
        .find_map(|token| token.parse::<MacAddress>().ok())
        .map(|mac| DetectedDevice::new(mac, None))
}

#[cfg(test)]
mod tests;
