//! Command-line runtime for `budsctl`.
//!
//! The runtime owns argument parsing, configuration bootstrapping, telemetry
//! and human-readable output. It writes only through the streams it is
//! given, and obtains its [`Client`] from a [`ClientFactory`], so tests can
//! run every command without Bluetooth hardware.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use budsctl_config::Config;
use budsctl_core::{BluetoothctlDiscovery, Client, Discovery};
use budsctl_plugins::{BleConfig, RfcommConfig};
use budsctl_transport::{GattTransport, RfcommTransport, Transport};
use clap::Parser;
use tracing::debug;

mod cli;
mod config;
mod errors;
mod output;
pub mod telemetry;

use cli::{Cli, Command};
use config::{ConfigLoader, OrthoConfigLoader, command_arguments, split_config_arguments};
use errors::AppError;

const CLI_TARGET: &str = "budsctl_cli";

/// Builds the [`Client`] a command runs against.
pub trait ClientFactory {
    /// RFCOMM transport of the produced client.
    type Rfcomm: Transport<Config = RfcommConfig>;
    /// BLE GATT transport of the produced client.
    type Ble: Transport<Config = BleConfig>;
    /// Device discovery of the produced client.
    type Discovery: Discovery;

    /// Creates a client for `config`.
    fn create(&self, config: &Config) -> Client<Self::Rfcomm, Self::Ble, Self::Discovery>;
}

/// Produces clients backed by real transports and `bluetoothctl` discovery.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClientFactory;

impl ClientFactory for SystemClientFactory {
    type Rfcomm = RfcommTransport;
    type Ble = GattTransport;
    type Discovery = BluetoothctlDiscovery;

    fn create(&self, config: &Config) -> Client {
        Client::from_config(config)
    }
}

/// Bundles the streams the runtime writes to.
struct IoStreams<'a, W: Write, E: Write> {
    stdout: &'a mut W,
    stderr: &'a mut E,
}

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader, F: ClientFactory> {
    io: IoStreams<'a, W, E>,
    loader: &'a L,
    factory: &'a F,
}

impl<W, E, L, F> CliRunner<'_, W, E, L, F>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
    F: ClientFactory,
{
    fn run(&mut self, args: &[OsString]) -> ExitCode {
        match self.try_run(args) {
            Ok(exit_code) => exit_code,
            Err(AppError::CliUsage(error)) => self.report_usage(&error),
            Err(error) => {
                // Nothing further can be reported when stderr is gone.
                writeln!(self.io.stderr, "Error: {error}").ok();
                ExitCode::FAILURE
            }
        }
    }

    fn try_run(&mut self, args: &[OsString]) -> Result<ExitCode, AppError> {
        let split = split_config_arguments(args);
        let cli = Cli::try_parse_from(command_arguments(args, &split))
            .map_err(AppError::CliUsage)?;
        let config = self.loader.load(&split.config_arguments)?;
        telemetry::initialise(&config)?;
        debug!(target: CLI_TARGET, command = ?cli.command, "running command");

        let client = self.factory.create(&config);
        for warning in client
            .load_warnings()
            .iter()
            .chain(client.runtime_warnings())
        {
            writeln!(self.io.stderr, "Warning: {warning}")?;
        }
        self.execute(&client, &cli.command)
    }

    fn execute(
        &mut self,
        client: &Client<F::Rfcomm, F::Ble, F::Discovery>,
        command: &Command,
    ) -> Result<ExitCode, AppError> {
        let stdout = &mut *self.io.stdout;
        match command {
            Command::List => {
                let plugins = client.list_plugins();
                if plugins.is_empty() {
                    writeln!(stdout, "No plugins loaded")?;
                    return Ok(ExitCode::FAILURE);
                }
                output::write_plugins(stdout, &plugins)?;
            }
            Command::Devices => {
                let devices = client.list_devices()?;
                output::write_devices(stdout, &devices, client.plugins())?;
            }
            Command::Features { target } => {
                let catalog = client.feature_catalog(&target.query())?;
                output::write_catalog(stdout, &catalog)?;
            }
            Command::Set {
                feature,
                value: None,
                target,
            } => {
                let (resolved, values) = client.feature_values(feature, &target.query())?;
                output::write_values(stdout, feature, &resolved, &values)?;
            }
            Command::Set {
                feature,
                value: Some(value),
                target,
            } => {
                let result = client.set_feature(feature, value, &target.query())?;
                output::write_sent(stdout, &result)?;
            }
        }
        Ok(ExitCode::SUCCESS)
    }

    /// Prints help, version, or a usage error with clap's own exit code.
    fn report_usage(&mut self, error: &clap::Error) -> ExitCode {
        let rendered = error.render();
        let written = if error.use_stderr() {
            write!(self.io.stderr, "{rendered}")
        } else {
            write!(self.io.stdout, "{rendered}")
        };
        if written.is_err() {
            return ExitCode::FAILURE;
        }
        u8::try_from(error.exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
    }
}

/// Runs the CLI with the real configuration loader and client factory.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_factory(args, stdout, stderr, &SystemClientFactory)
}

/// Runs the CLI with the real configuration loader and a custom client
/// factory.
#[must_use]
pub fn run_with_factory<I, W, E, F>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    factory: &F,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    F: ClientFactory,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader, factory)
}

fn run_with_loader<I, W, E, L, F>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
    factory: &F,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    F: ClientFactory,
{
    let mut runner = CliRunner {
        io: IoStreams { stdout, stderr },
        loader,
        factory,
    };
    let arguments: Vec<OsString> = args.into_iter().collect();
    runner.run(&arguments)
}
