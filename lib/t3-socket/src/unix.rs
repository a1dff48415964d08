/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::io;
use std::os::unix::net::{UnixListener, UnixStream};

use t3_types::net::UnixAddr;

#[cfg(any(target_os = "linux", target_os = "android"))]
fn abstract_addr(name: &[u8]) -> io::Result<std::os::unix::net::SocketAddr> {
    use std::os::linux::net::SocketAddrExt;

    std::os::unix::net::SocketAddr::from_abstract_name(name)
}

/// Create a bound and listening std socket for `addr`.
pub fn new_std_listener(addr: &UnixAddr) -> io::Result<UnixListener> {
    let listener = match addr {
        UnixAddr::Pathname(path) => UnixListener::bind(path)?,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        UnixAddr::Abstract(name) => UnixListener::bind_addr(&abstract_addr(name)?)?,
        UnixAddr::Unnamed => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot listen on an unnamed address",
            ));
        }
    };
    listener.set_nonblocking(true)?;
    Ok(listener)
}

/// Connect a std stream socket to `addr`.
///
/// Local-domain connects complete without waiting for a remote peer, so
/// the blocking call is done here and the socket is switched to
/// non-blocking before it is handed to the async runtime.
pub fn new_std_stream_to(addr: &UnixAddr) -> io::Result<UnixStream> {
    let stream = match addr {
        UnixAddr::Pathname(path) => UnixStream::connect(path)?,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        UnixAddr::Abstract(name) => UnixStream::connect_addr(&abstract_addr(name)?)?,
        UnixAddr::Unnamed => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot connect to an unnamed address",
            ));
        }
    };
    stream.set_nonblocking(true)?;
    Ok(stream)
}
