/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::tcp;
#[cfg(unix)]
use tokio::net::unix;
#[cfg(unix)]
use tokio::net::UnixStream;
use tokio::net::TcpStream;

use t3_types::net::Endpoint;
#[cfg(unix)]
use t3_types::net::UnixAddr;

/// A connected stream socket, either TCP or local-domain.
pub enum PeerStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl PeerStream {
    /// Connect to `endpoint`.
    ///
    /// TCP streams get `TCP_NODELAY` as they carry relay traffic that is
    /// forwarded as it arrives.
    pub async fn connect(endpoint: &Endpoint) -> io::Result<PeerStream> {
        match endpoint {
            Endpoint::Tcp(addr) => {
                let socket = t3_socket::tcp::new_socket_to(addr.ip())?;
                let stream = socket.connect(*addr).await?;
                stream.set_nodelay(true)?;
                Ok(PeerStream::Tcp(stream))
            }
            #[cfg(unix)]
            Endpoint::Unix(addr) => {
                let stream = match addr {
                    UnixAddr::Pathname(path) => UnixStream::connect(path).await?,
                    #[cfg(any(target_os = "linux", target_os = "android"))]
                    UnixAddr::Abstract(_) => {
                        UnixStream::from_std(t3_socket::unix::new_std_stream_to(addr)?)?
                    }
                    UnixAddr::Unnamed => {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidInput,
                            "cannot connect to an unnamed address",
                        ));
                    }
                };
                Ok(PeerStream::Unix(stream))
            }
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "local-domain sockets are not supported on this platform",
            )),
        }
    }

    pub fn into_split(self) -> (StreamReader, StreamWriter) {
        match self {
            PeerStream::Tcp(stream) => {
                let (r, w) = stream.into_split();
                (StreamReader::Tcp(r), StreamWriter::Tcp(w))
            }
            #[cfg(unix)]
            PeerStream::Unix(stream) => {
                let (r, w) = stream.into_split();
                (StreamReader::Unix(r), StreamWriter::Unix(w))
            }
        }
    }
}

macro_rules! delegate_async_read {
    ($type:ty) => {
        impl AsyncRead for $type {
            fn poll_read(
                self: Pin<&mut Self>,
                cx: &mut Context<'_>,
                buf: &mut ReadBuf<'_>,
            ) -> Poll<io::Result<()>> {
                match self.get_mut() {
                    Self::Tcp(s) => Pin::new(s).poll_read(cx, buf),
                    #[cfg(unix)]
                    Self::Unix(s) => Pin::new(s).poll_read(cx, buf),
                }
            }
        }
    };
}

macro_rules! delegate_async_write {
    ($type:ty) => {
        impl AsyncWrite for $type {
            fn poll_write(
                self: Pin<&mut Self>,
                cx: &mut Context<'_>,
                buf: &[u8],
            ) -> Poll<io::Result<usize>> {
                match self.get_mut() {
                    Self::Tcp(s) => Pin::new(s).poll_write(cx, buf),
                    #[cfg(unix)]
                    Self::Unix(s) => Pin::new(s).poll_write(cx, buf),
                }
            }

            fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
                match self.get_mut() {
                    Self::Tcp(s) => Pin::new(s).poll_flush(cx),
                    #[cfg(unix)]
                    Self::Unix(s) => Pin::new(s).poll_flush(cx),
                }
            }

            fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
                match self.get_mut() {
                    Self::Tcp(s) => Pin::new(s).poll_shutdown(cx),
                    #[cfg(unix)]
                    Self::Unix(s) => Pin::new(s).poll_shutdown(cx),
                }
            }
        }
    };
}

delegate_async_read!(PeerStream);
delegate_async_write!(PeerStream);

/// Owned read half of a [`PeerStream`].
pub enum StreamReader {
    Tcp(tcp::OwnedReadHalf),
    #[cfg(unix)]
    Unix(unix::OwnedReadHalf),
}

/// Owned write half of a [`PeerStream`].
pub enum StreamWriter {
    Tcp(tcp::OwnedWriteHalf),
    #[cfg(unix)]
    Unix(unix::OwnedWriteHalf),
}

delegate_async_read!(StreamReader);
delegate_async_write!(StreamWriter);
