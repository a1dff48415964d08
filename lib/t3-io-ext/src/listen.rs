/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::io;

use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;

use t3_types::net::Endpoint;
#[cfg(unix)]
use t3_types::net::UnixAddr;

use super::PeerStream;

/// A listening stream socket, either TCP or local-domain.
pub enum StreamListener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl StreamListener {
    /// Bind and listen on `endpoint`. Must be called from within an async
    /// runtime so the socket registers with the reactor.
    pub fn bind(endpoint: &Endpoint) -> io::Result<StreamListener> {
        match endpoint {
            Endpoint::Tcp(addr) => {
                let listener = t3_socket::tcp::new_std_listener(*addr)?;
                Ok(StreamListener::Tcp(TcpListener::from_std(listener)?))
            }
            #[cfg(unix)]
            Endpoint::Unix(addr) => {
                let listener = t3_socket::unix::new_std_listener(addr)?;
                Ok(StreamListener::Unix(UnixListener::from_std(listener)?))
            }
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "local-domain sockets are not supported on this platform",
            )),
        }
    }

    /// Accept the next peer. TCP peers get `TCP_NODELAY` like connected
    /// streams do.
    pub async fn accept(&self) -> io::Result<(PeerStream, Endpoint)> {
        match self {
            StreamListener::Tcp(listener) => {
                let (stream, peer_addr) = listener.accept().await?;
                stream.set_nodelay(true)?;
                Ok((PeerStream::Tcp(stream), Endpoint::Tcp(peer_addr)))
            }
            #[cfg(unix)]
            StreamListener::Unix(listener) => {
                let (stream, peer_addr) = listener.accept().await?;
                let peer = match peer_addr.as_pathname() {
                    Some(path) => UnixAddr::Pathname(path.to_path_buf()),
                    None => UnixAddr::Unnamed,
                };
                Ok((PeerStream::Unix(stream), Endpoint::Unix(peer)))
            }
        }
    }

    /// The endpoint this listener is bound to.
    pub fn local_endpoint(&self) -> io::Result<Endpoint> {
        match self {
            StreamListener::Tcp(listener) => Ok(Endpoint::Tcp(listener.local_addr()?)),
            #[cfg(unix)]
            StreamListener::Unix(listener) => {
                let addr = listener.local_addr()?;
                let local = match addr.as_pathname() {
                    Some(path) => UnixAddr::Pathname(path.to_path_buf()),
                    None => UnixAddr::Unnamed,
                };
                Ok(Endpoint::Unix(local))
            }
        }
    }
}
