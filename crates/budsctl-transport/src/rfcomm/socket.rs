//! Linux `AF_BLUETOOTH` RFCOMM sockets via `socket2`.

use std::io::{self, Read, Write};
use std::mem;
use std::net::Shutdown;
use std::time::Duration;

use budsctl_plugins::RfcommConfig;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::debug;

use super::{RFCOMM_TARGET, RfcommConnector, endpoint};
use crate::error::TransportError;
use crate::session::Link;

/// `BTPROTO_RFCOMM` from `<bluetooth/bluetooth.h>`.
const BTPROTO_RFCOMM: libc::c_int = 3;

/// Largest response read after a write.
const RESPONSE_BUFFER_BYTES: usize = 1024;

/// `struct sockaddr_rc` from `<bluetooth/rfcomm.h>`.
#[repr(C)]
struct SockaddrRc {
    rc_family: libc::sa_family_t,
    rc_bdaddr: [u8; 6],
    rc_channel: u8,
}

/// Opens kernel RFCOMM sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketConnector;

impl RfcommConnector for SocketConnector {
    type Link = RfcommSocket;

    fn open(&self, mac: &str, config: &RfcommConfig) -> Result<RfcommSocket, TransportError> {
        let label = endpoint(config);
        let address = rfcomm_address(mac, config.channel())
            .map_err(|err| TransportError::connect_io(mac, &label, err))?;
        let socket = Socket::new(
            Domain::from(libc::AF_BLUETOOTH),
            Type::STREAM,
            Some(Protocol::from(BTPROTO_RFCOMM)),
        )
        .map_err(|err| {
            TransportError::connect(mac, &label, format!("could not create RFCOMM socket: {err}"))
        })?;
        Ok(RfcommSocket {
            socket: Some(socket),
            address,
            mac: mac.to_owned(),
            endpoint: label,
            timeout: config.timeout(),
        })
    }
}

/// One RFCOMM socket, open until [`Link::close`].
#[derive(Debug)]
pub struct RfcommSocket {
    socket: Option<Socket>,
    address: SockAddr,
    mac: String,
    endpoint: String,
    timeout: Duration,
}

impl RfcommSocket {
    fn socket(&mut self) -> Result<&mut Socket, TransportError> {
        self.socket
            .as_mut()
            .ok_or_else(|| TransportError::send(&self.mac, &self.endpoint, "socket already closed"))
    }
}

impl Link for RfcommSocket {
    fn connect(&mut self) -> Result<(), TransportError> {
        let timeout = self.timeout;
        let result = self
            .socket
            .as_ref()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))
            .and_then(|socket| socket.connect_timeout(&self.address, timeout));
        result.map_err(|err| connect_failure(&self.mac, &self.endpoint, timeout, err))
    }

    fn write(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let socket = self.socket()?;
        let result = socket.write_all(payload).and_then(|()| socket.flush());
        result.map_err(|err| TransportError::send_io(&self.mac, &self.endpoint, err))
    }

    fn expects_response(&self) -> bool {
        true
    }

    fn read_response(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let timeout = self.timeout;
        let socket = self.socket()?;
        let mut buffer = [0_u8; RESPONSE_BUFFER_BYTES];
        let result = socket
            .set_read_timeout(Some(timeout))
            .and_then(|()| socket.read(&mut buffer));
        match result {
            Ok(0) => Ok(None),
            Ok(read) => Ok(buffer.get(..read).map(<[u8]>::to_vec)),
            Err(err)
                if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
            {
                debug!(target: RFCOMM_TARGET, mac = %self.mac, "no response before timeout");
                Ok(None)
            }
            Err(err) => Err(TransportError::send_io(&self.mac, &self.endpoint, err)),
        }
    }

    fn close(&mut self) {
        if let Some(socket) = self.socket.take()
            && let Err(err) = socket.shutdown(Shutdown::Both)
        {
            debug!(target: RFCOMM_TARGET, mac = %self.mac, error = %err, "shutdown failed");
        }
    }
}

/// Parses `AA:BB:CC:DD:EE:FF` into the little-endian `bdaddr_t` byte order.
fn parse_bdaddr(mac: &str) -> io::Result<[u8; 6]> {
    let invalid = || {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid Bluetooth address '{mac}'"),
        )
    };
    let mut octets = [0_u8; 6];
    let mut parts = mac.split([':', '-']);
    for slot in octets.iter_mut().rev() {
        let part = parts.next().ok_or_else(invalid)?;
        if part.len() != 2 {
            return Err(invalid());
        }
        *slot = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
    }
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok(octets)
}

fn rfcomm_address(mac: &str, channel: u8) -> io::Result<SockAddr> {
    let address = SockaddrRc {
        rc_family: libc::sa_family_t::try_from(libc::AF_BLUETOOTH)
            .map_err(|_| io::Error::from(io::ErrorKind::Unsupported))?,
        rc_bdaddr: parse_bdaddr(mac)?,
        rc_channel: channel,
    };
    let len = libc::socklen_t::try_from(mem::size_of::<SockaddrRc>())
        .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;

    // SAFETY: `sockaddr_storage` is all-integer, so zeroed is a valid value,
    // and it is large enough and sufficiently aligned to hold `SockaddrRc`.
    // `len` covers exactly the bytes written.
    let storage = unsafe {
        let mut storage: libc::sockaddr_storage = mem::zeroed();
        (&raw mut storage).cast::<SockaddrRc>().write(address);
        storage
    };
    // SAFETY: `storage` holds an initialised `sockaddr_rc` of `len` bytes.
    Ok(unsafe { SockAddr::new(storage, len) })
}

/// Maps a failed `connect` call, naming the bound when it timed out.
fn connect_failure(
    mac: &str,
    endpoint: &str,
    timeout: Duration,
    err: io::Error,
) -> TransportError {
    if err.kind() == io::ErrorKind::TimedOut {
        TransportError::connect(
            mac,
            endpoint,
            format!("connect timed out after {:.1}s", timeout.as_secs_f64()),
        )
    } else {
        TransportError::connect_io(mac, endpoint, err)
    }
}
