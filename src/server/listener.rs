// Listener module
// Creates the TCP listener, moving on to the next port while the requested one is taken

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::logger;

/// Ports tried before giving up when the requested one is in use
pub const MAX_PORT_ATTEMPTS: u16 = 1000;

/// Create a `TcpListener` with `SO_REUSEADDR` enabled.
///
/// `SO_REUSEPORT` stays off, so binding a port held by another server fails
/// with `AddrInUse`.
pub fn create_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // Allows rebinding a port still in TIME_WAIT after a restart
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

/// Bind `addr`, or with `strict` unset the first free port after it
///
/// Only `AddrInUse` moves on to the next port; any other failure, and any
/// failure in strict mode, is returned as is.
pub fn bind_with_retry(addr: SocketAddr, strict: bool) -> io::Result<TcpListener> {
    let mut candidate = addr;
    let mut attempts = 1;
    loop {
        match create_listener(candidate) {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse && !strict => {
                logger::log_port_in_use(&candidate);
                let next = candidate.port().checked_add(1).filter(|&p| p != 0);
                match next {
                    Some(port) if attempts < MAX_PORT_ATTEMPTS => {
                        candidate.set_port(port);
                        attempts += 1;
                    }
                    _ => {
                        return Err(io::Error::new(
                            io::ErrorKind::AddrInUse,
                            format!("no free port after {attempts} attempts from {addr}"),
                        ));
                    }
                }
            }
            Err(e) => return Err(e),
        }
    }
}
