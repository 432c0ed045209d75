//! `BlueZ` GATT client via `bluer`.
//!
//! `bluer` is async; each link owns a current-thread `tokio` runtime and
//! blocks on it so the [`Link`] contract stays synchronous. The notification
//! subscription is opened before the write and awaited in the same task, so a
//! reply sent immediately after the write cannot be missed;
//! [`Link::read_response`] then reports that outcome.

use std::pin::pin;
use std::time::Duration;

use bluer::gatt::WriteOp;
use bluer::gatt::remote::{Characteristic, CharacteristicWriteRequest};
use bluer::{Address, Device, Session};
use budsctl_plugins::BleConfig;
use futures::StreamExt;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use super::{GATT_TARGET, GattConnector, endpoint};
use crate::error::TransportError;
use crate::session::Link;

/// Interval between checks for completed service discovery.
const SERVICES_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Opens links through the system `BlueZ` daemon.
#[derive(Debug, Clone, Copy, Default)]
pub struct BluezConnector;

impl GattConnector for BluezConnector {
    type Link = BluezLink;

    fn open(&self, mac: &str, config: &BleConfig) -> Result<BluezLink, TransportError> {
        let label = endpoint(config);
        let address: Address = mac.parse().map_err(|err| {
            TransportError::connect(mac, &label, format!("invalid address: {err}"))
        })?;
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| TransportError::connect_io(mac, &label, err))?;
        Ok(BluezLink {
            runtime,
            address,
            config: config.clone(),
            mac: mac.to_owned(),
            endpoint: label,
            connection: None,
            notification: None,
        })
    }
}

/// State held while a device is connected.
struct Connection {
    _session: Session,
    device: Device,
    write_char: Characteristic,
    notify_char: Option<Characteristic>,
}

/// One GATT connection, open until [`Link::close`].
pub struct BluezLink {
    runtime: Runtime,
    address: Address,
    config: BleConfig,
    mac: String,
    endpoint: String,
    connection: Option<Connection>,
    notification: Option<Result<Vec<u8>, TransportError>>,
}

impl BluezLink {
    fn connect_error(&self, message: impl Into<String>) -> TransportError {
        TransportError::connect(&self.mac, &self.endpoint, message)
    }

    fn send_error(&self, message: impl Into<String>) -> TransportError {
        TransportError::send(&self.mac, &self.endpoint, message)
    }

    async fn establish(&self) -> Result<Connection, TransportError> {
        let timeout = self.config.timeout();
        let session = Session::new()
            .await
            .map_err(|err| self.connect_error(format!("bluetooth session unavailable: {err}")))?;
        let adapter = session
            .default_adapter()
            .await
            .map_err(|err| self.connect_error(format!("no bluetooth adapter: {err}")))?;
        let device = adapter
            .device(self.address)
            .map_err(|err| self.connect_error(err.to_string()))?;

        // BlueZ keeps a timed-out `Connect` call running, so every failure
        // still disconnects.
        if let Err(message) = connect_within(timeout, device.connect()).await {
            disconnect(&device, &self.mac).await;
            return Err(self.connect_error(message));
        }

        let located = match tokio::time::timeout(timeout, self.locate(&device)).await {
            Ok(result) => result,
            Err(_) => Err(self.connect_error("timed out resolving GATT services")),
        };
        match located {
            Ok((write_char, notify_char)) => Ok(Connection {
                _session: session,
                device,
                write_char,
                notify_char,
            }),
            Err(err) => {
                disconnect(&device, &self.mac).await;
                Err(err)
            }
        }
    }

    async fn locate(
        &self,
        device: &Device,
    ) -> Result<(Characteristic, Option<Characteristic>), TransportError> {
        let to_error = |err: bluer::Error| self.connect_error(err.to_string());
        while !device.is_services_resolved().await.map_err(to_error)? {
            tokio::time::sleep(SERVICES_POLL_INTERVAL).await;
        }

        let service_uuid = self.config.service_uuid().uuid();
        let write_uuid = self.config.write_char_uuid().uuid();
        let notify_uuid = self.config.notify_char_uuid().map(|uuid| uuid.uuid());

        for service in device.services().await.map_err(to_error)? {
            if service.uuid().await.map_err(to_error)? != service_uuid {
                continue;
            }
            let mut write_char = None;
            let mut notify_char = None;
            for characteristic in service.characteristics().await.map_err(to_error)? {
                let uuid = characteristic.uuid().await.map_err(to_error)?;
                if Some(uuid) == notify_uuid {
                    notify_char = Some(characteristic.clone());
                }
                if uuid == write_uuid {
                    write_char = Some(characteristic);
                }
            }
            let write = write_char.ok_or_else(|| {
                self.connect_error(format!(
                    "write characteristic {} not found",
                    self.config.write_char_uuid()
                ))
            })?;
            if let Some(wanted) = self.config.notify_char_uuid()
                && notify_char.is_none()
            {
                return Err(self.connect_error(format!(
                    "notify characteristic {wanted} not found"
                )));
            }
            return Ok((write, notify_char));
        }
        Err(self.connect_error(format!("service {} not found", self.config.service_uuid())))
    }

    fn write_request(&self) -> CharacteristicWriteRequest {
        let mut request = CharacteristicWriteRequest::default();
        request.op_type = if self.config.write_with_response() {
            WriteOp::Request
        } else {
            WriteOp::Command
        };
        request
    }
}

impl Link for BluezLink {
    fn connect(&mut self) -> Result<(), TransportError> {
        let connection = self.runtime.block_on(self.establish())?;
        debug!(target: GATT_TARGET, mac = %self.mac, "gatt connected");
        self.connection = Some(connection);
        Ok(())
    }

    fn write(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let Some(connection) = self.connection.as_ref() else {
            return Err(self.send_error("device is not connected"));
        };
        let request = self.write_request();
        let timeout = self.config.timeout();

        let Some(notify_char) = connection.notify_char.as_ref() else {
            return self
                .runtime
                .block_on(connection.write_char.write_ext(payload, &request))
                .map_err(|err| self.send_error(err.to_string()));
        };

        let notification = self.runtime.block_on(async {
            let stream = notify_char
                .notify()
                .await
                .map_err(|err| self.send_error(format!("could not subscribe: {err}")))?;
            let mut stream = pin!(stream);
            connection
                .write_char
                .write_ext(payload, &request)
                .await
                .map_err(|err| self.send_error(err.to_string()))?;
            Ok(match tokio::time::timeout(timeout, stream.next()).await {
                Ok(Some(value)) => Ok(value),
                Ok(None) | Err(_) => {
                    Err(TransportError::timeout(&self.mac, &self.endpoint, timeout))
                }
            })
        })?;
        self.notification = Some(notification);
        Ok(())
    }

    fn expects_response(&self) -> bool {
        true
    }

    fn read_response(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if let Some(notification) = self.notification.take() {
            return notification.map(Some);
        }
        let Some(connection) = self.connection.as_ref() else {
            return Err(self.send_error("device is not connected"));
        };
        match self.runtime.block_on(connection.write_char.read()) {
            Ok(value) if value.is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                debug!(target: GATT_TARGET, mac = %self.mac, error = %err, "read-back failed");
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.notification = None;
        if let Some(connection) = self.connection.take() {
            self.runtime.block_on(disconnect(&connection.device, &self.mac));
        }
    }
}

/// Awaits a connect attempt for at most `timeout`, rendering any failure as
/// a message.
async fn connect_within<E, F>(timeout: Duration, attempt: F) -> Result<(), String>
where
    E: std::fmt::Display,
    F: Future<Output = Result<(), E>>,
{
    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(err.to_string()),
        Err(_) => Err(format!(
            "connect timed out after {:.1}s",
            timeout.as_secs_f64()
        )),
    }
}

async fn disconnect(device: &Device, mac: &str) {
    if let Err(err) = device.disconnect().await {
        debug!(target: GATT_TARGET, mac, error = %err, "disconnect failed");
    }
}

#[cfg(test)]
mod tests {
    use std::future;

    use rstest::rstest;

    use super::*;

    fn block_on<T>(work: impl Future<Output = T>) -> T {
        Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("test runtime")
            .block_on(work)
    }

    #[test]
    fn stalled_connect_times_out() {
        let outcome = block_on(connect_within(
            Duration::from_millis(20),
            future::pending::<Result<(), String>>(),
        ));
        assert_eq!(outcome, Err(String::from("connect timed out after 0.0s")));
    }

    #[rstest]
    #[case::aborted(Err(String::from("le-connection-abort")), Some("le-connection-abort"))]
    #[case::connected(Ok(()), None)]
    fn connect_outcome_is_reported(
        #[case] result: Result<(), String>,
        #[case] expected: Option<&str>,
    ) {
        let outcome = block_on(connect_within(Duration::from_secs(1), future::ready(result)));
        assert_eq!(outcome.err().as_deref(), expected);
    }
}
