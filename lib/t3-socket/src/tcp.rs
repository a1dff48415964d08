/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::io;
use std::net::{IpAddr, SocketAddr};

use socket2::{Domain, SockAddr, Socket, Type};
use tokio::net::TcpSocket;

fn domain_of(ip: &IpAddr) -> Domain {
    match ip {
        IpAddr::V4(_) => Domain::IPV4,
        IpAddr::V6(_) => Domain::IPV6,
    }
}

#[cfg(any(windows, target_os = "macos"))]
fn new_tcp_socket(domain: Domain) -> io::Result<Socket> {
    let socket = Socket::new(domain, Type::STREAM, None)?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
))]
fn new_tcp_socket(domain: Domain) -> io::Result<Socket> {
    Socket::new(domain, Type::STREAM.nonblocking(), None)
}

/// Create a bound and listening std socket for `addr`.
///
/// Address reuse is enabled so a restarted process can rebind while old
/// connections linger in TIME_WAIT. The backlog is the platform maximum.
pub fn new_std_listener(addr: SocketAddr) -> io::Result<std::net::TcpListener> {
    let socket = new_tcp_socket(domain_of(&addr.ip()))?;
    #[cfg(unix)]
    socket.set_reuse_address(true)?;
    let bind_addr: SockAddr = addr.into();
    socket.bind(&bind_addr)?;
    socket.listen(libc::SOMAXCONN)?;
    Ok(std::net::TcpListener::from(socket))
}

/// Create an unconnected socket of the family matching `peer_ip`, ready
/// for an asynchronous connect.
pub fn new_socket_to(peer_ip: IpAddr) -> io::Result<TcpSocket> {
    let socket = new_tcp_socket(domain_of(&peer_ip))?;
    Ok(TcpSocket::from_std_stream(std::net::TcpStream::from(socket)))
}
