//! Unit tests for device discovery.

use std::cell::RefCell;
use std::collections::VecDeque;

use rstest::rstest;

use super::*;

type Reply = fn() -> io::Result<CommandOutput>;

/// Replays canned replies, asserting the commands arrive in order.
struct ScriptedRunner {
    script: RefCell<VecDeque<(&'static str, Reply)>>,
}

impl ScriptedRunner {
    fn new(script: Vec<(&'static str, Reply)>) -> Self {
        Self {
            script: RefCell::new(script.into()),
        }
    }

    fn finished(&self) -> bool {
        self.script.borrow().is_empty()
    }
}

impl CommandRunner for &ScriptedRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        let (expected, reply) = self
            .script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected command: {line}"));
        assert_eq!(line, expected);
        reply()
    }
}

fn step(command: &'static str, reply: Reply) -> (&'static str, Reply) {
    (command, reply)
}

fn ok(stdout: &str) -> io::Result<CommandOutput> {
    Ok(CommandOutput {
        success: true,
        stdout: stdout.to_owned(),
        stderr: String::new(),
    })
}

fn failed(stderr: &str) -> io::Result<CommandOutput> {
    Ok(CommandOutput {
        success: false,
        stdout: String::new(),
        stderr: stderr.to_owned(),
    })
}

fn not_found() -> io::Result<CommandOutput> {
    Err(io::Error::new(io::ErrorKind::NotFound, "no such file"))
}

fn empty() -> io::Result<CommandOutput> {
    ok("")
}

fn names(devices: &[DetectedDevice]) -> Vec<(String, Option<String>)> {
    devices
        .iter()
        .map(|device| (device.mac().to_string(), device.name().map(str::to_owned)))
        .collect()
}

// ---------------------------------------------------------------------------
// Line parsing
// ---------------------------------------------------------------------------

#[rstest]
#[case("Device 88:92:CC:11:22:33 OnePlus Buds 4", Some(("88:92:CC:11:22:33", Some("OnePlus Buds 4"))))]
#[case("  Device 88:92:cc:11:22:33   Buds  ", Some(("88:92:CC:11:22:33", Some("Buds"))))]
#[case("Device 88:92:CC:11:22:33", Some(("88:92:CC:11:22:33", None)))]
#[case("Devices 88:92:CC:11:22:33 Buds", None)]
#[case("Device not-a-mac Buds", None)]
#[case("[CHG] Controller 00:11:22:33:44:55 Powered: yes", None)]
fn parses_bluetoothctl_lines(#[case] line: &str, #[case] expected: Option<(&str, Option<&str>)>) {
    let parsed = parse_device_line(line);
    let actual = parsed
        .as_ref()
        .map(|device| (device.mac().to_string(), device.name().map(str::to_owned)));
    let wanted = expected.map(|(mac, name)| (mac.to_owned(), name.map(str::to_owned)));
    assert_eq!(actual, wanted);
}

#[rstest]
#[case("\t< ACL 88:92:CC:11:22:33 handle 11 state 1 lm MASTER", Some("88:92:CC:11:22:33"))]
#[case("Connections:", None)]
fn parses_hcitool_lines(#[case] line: &str, #[case] expected: Option<&str>) {
    let parsed = parse_connection_line(line);
    assert_eq!(
        parsed.as_ref().map(|device| device.mac().to_string()),
        expected.map(str::to_owned)
    );
    assert!(parsed.is_none_or(|device| device.name().is_none()));
}

// ---------------------------------------------------------------------------
// Command sequencing
// ---------------------------------------------------------------------------

#[test]
fn merges_bluetoothctl_lists_first_report_wins() {
    let runner = ScriptedRunner::new(vec![
        step("bluetoothctl devices Connected", || {
            ok("Device 88:92:CC:11:22:33 OnePlus Buds 4\n")
        }),
        step("bluetoothctl devices", || {
            ok("Device 88:92:CC:11:22:33 Renamed\nDevice AA:BB:CC:DD:EE:FF Speaker\n")
        }),
        step("bluetoothctl paired-devices", not_found),
    ]);

    let devices = BluetoothctlDiscovery::with_runner(&runner)
        .discover()
        .expect("discovery succeeds");

    assert!(runner.finished());
    assert_eq!(
        names(&devices),
        vec![
            (String::from("88:92:CC:11:22:33"), Some(String::from("OnePlus Buds 4"))),
            (String::from("AA:BB:CC:DD:EE:FF"), Some(String::from("Speaker"))),
        ]
    );
}

#[test]
fn falls_back_to_hcitool_when_bluetoothctl_finds_nothing() {
    let runner = ScriptedRunner::new(vec![
        step("bluetoothctl devices Connected", empty),
        step("bluetoothctl devices", empty),
        step("bluetoothctl paired-devices", empty),
        step("hcitool con", || {
            ok("Connections:\n\t< ACL 88:92:CC:11:22:33 handle 11 state 1 lm MASTER\n")
        }),
    ]);

    let devices = BluetoothctlDiscovery::with_runner(&runner)
        .discover()
        .expect("discovery succeeds");

    assert!(runner.finished());
    assert_eq!(names(&devices), vec![(String::from("88:92:CC:11:22:33"), None)]);
}

#[test]
fn reports_failures_when_nothing_is_found() {
    let runner = ScriptedRunner::new(vec![
        step("bluetoothctl devices Connected", || {
            failed("No default controller available\n")
        }),
        step("bluetoothctl devices", || failed("")),
        step("bluetoothctl paired-devices", not_found),
        step("hcitool con", not_found),
    ]);

    let error = BluetoothctlDiscovery::with_runner(&runner)
        .discover()
        .expect_err("discovery fails");

    let DiscoveryError::CommandsFailed { details } = error;
    assert_eq!(
        details,
        vec![String::from(
            "bluetoothctl devices Connected -> No default controller available"
        )]
    );
}

#[test]
fn missing_tools_yield_an_empty_list() {
    let runner = ScriptedRunner::new(vec![
        step("bluetoothctl devices Connected", not_found),
        step("bluetoothctl devices", not_found),
        step("bluetoothctl paired-devices", not_found),
        step("hcitool con", not_found),
    ]);

    let devices = BluetoothctlDiscovery::with_runner(&runner)
        .discover()
        .expect("missing tools are not an error");

    assert!(devices.is_empty());
    assert!(runner.finished());
}

#[test]
fn static_discovery_returns_its_list() {
    let mac: MacAddress = "88:92:CC:11:22:33".parse().expect("valid address");
    let discovery = StaticDiscovery::new(vec![DetectedDevice::named(mac, "Buds")]);
    let devices = discovery.discover().expect("static discovery succeeds");
    assert_eq!(devices.len(), 1);
}
