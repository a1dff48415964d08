/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::anyhow;

/// Conventional size of `sun_path`, including the trailing NUL for
/// pathname sockets.
pub const UNIX_PATH_MAX: usize = 108;

/// A local-domain socket address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnixAddr {
    /// A socket bound to a filesystem path.
    Pathname(PathBuf),
    /// A socket in the abstract namespace. The leading NUL byte is not
    /// stored here.
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Abstract(Vec<u8>),
    /// An unbound peer socket, as commonly seen on accepted connections.
    Unnamed,
}

impl fmt::Display for UnixAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnixAddr::Pathname(path) => write!(f, "{}", path.display()),
            #[cfg(any(target_os = "linux", target_os = "android"))]
            UnixAddr::Abstract(name) => {
                write!(f, "@{}", String::from_utf8_lossy(name))
            }
            UnixAddr::Unnamed => write!(f, "(unnamed)"),
        }
    }
}

/// A listen or connect endpoint.
///
/// The text form is `A.B.C.D:P` for IPv4, `[v6]:P` for IPv6 and a
/// filesystem path otherwise. A leading `@` selects the abstract
/// local-domain namespace on platforms that have one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Tcp(SocketAddr),
    Unix(UnixAddr),
}

impl Endpoint {
    pub fn is_tcp(&self) -> bool {
        matches!(self, Endpoint::Tcp(_))
    }

    /// The TCP socket address, if this is a TCP endpoint.
    pub fn tcp_addr(&self) -> Option<SocketAddr> {
        match self {
            Endpoint::Tcp(addr) => Some(*addr),
            Endpoint::Unix(_) => None,
        }
    }

    fn parse_unix(s: &str) -> anyhow::Result<UnixAddr> {
        if let Some(name) = s.strip_prefix('@') {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            {
                if name.is_empty() {
                    return Err(anyhow!("empty abstract socket name"));
                }
                if name.len() >= UNIX_PATH_MAX {
                    return Err(anyhow!(
                        "abstract socket name too long ({} > {})",
                        name.len(),
                        UNIX_PATH_MAX - 1
                    ));
                }
                return Ok(UnixAddr::Abstract(name.as_bytes().to_vec()));
            }
            #[cfg(not(any(target_os = "linux", target_os = "android")))]
            {
                let _ = name;
                return Err(anyhow!(
                    "abstract local-domain sockets are not supported on this platform"
                ));
            }
        }

        if s.is_empty() {
            return Err(anyhow!("empty socket path"));
        }
        if s.len() >= UNIX_PATH_MAX {
            return Err(anyhow!(
                "socket path too long ({} > {})",
                s.len(),
                UNIX_PATH_MAX - 1
            ));
        }
        Ok(UnixAddr::Pathname(PathBuf::from(s)))
    }
}

impl FromStr for Endpoint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(anyhow!("empty endpoint"));
        }

        // Only numeric `ip:port` / `[v6]:port` forms name TCP endpoints,
        // everything else is a local-domain path.
        if let Ok(addr) = SocketAddr::from_str(s) {
            if addr.port() == 0 {
                return Err(anyhow!("invalid port 0 in endpoint {s}"));
            }
            return Ok(Endpoint::Tcp(addr));
        }
        if s.starts_with('[') {
            // A bracketed address that failed to parse is a malformed v6
            // endpoint, not a strange filename.
            return Err(anyhow!("invalid IPv6 endpoint {s}"));
        }

        Endpoint::parse_unix(s).map(Endpoint::Unix)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "{addr}"),
            Endpoint::Unix(addr) => write!(f, "{addr}"),
        }
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Endpoint::Tcp(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(s: &str) {
        let e = Endpoint::from_str(s).unwrap();
        assert_eq!(Endpoint::from_str(&e.to_string()).unwrap(), e);
    }

    #[test]
    fn parse_ipv4() {
        let e = Endpoint::from_str("127.0.0.1:9000").unwrap();
        assert_eq!(
            e,
            Endpoint::Tcp(SocketAddr::from_str("127.0.0.1:9000").unwrap())
        );
        assert_eq!(e.to_string(), "127.0.0.1:9000");
        round_trip("0.0.0.0:1");
        round_trip("192.168.1.1:65535");
    }

    #[test]
    fn parse_ipv6() {
        let e = Endpoint::from_str("[::1]:8080").unwrap();
        assert!(e.is_tcp());
        assert_eq!(e.to_string(), "[::1]:8080");
        round_trip("[2001:db8::1]:443");
        round_trip("[::]:9000");
    }

    #[test]
    fn reject_bad_ports() {
        assert!(Endpoint::from_str("127.0.0.1:0").is_err());
        // out-of-range port fails SocketAddr parsing and the leftover is
        // not a sane path either, but it must not be accepted as TCP
        let e = Endpoint::from_str("127.0.0.1:65536").unwrap();
        assert!(!e.is_tcp());
    }

    #[test]
    fn reject_malformed_ipv6() {
        assert!(Endpoint::from_str("[:::1]:80").is_err());
        assert!(Endpoint::from_str("[::1]").is_err());
        assert!(Endpoint::from_str("[::1]:0").is_err());
    }

    #[test]
    fn parse_pathname() {
        let e = Endpoint::from_str("/run/t3/relay.sock").unwrap();
        assert_eq!(
            e,
            Endpoint::Unix(UnixAddr::Pathname(PathBuf::from("/run/t3/relay.sock")))
        );
        assert_eq!(e.to_string(), "/run/t3/relay.sock");
        round_trip("relay.sock");
    }

    #[test]
    fn reject_long_pathname() {
        let long = "/tmp/".to_string() + &"x".repeat(UNIX_PATH_MAX);
        assert!(Endpoint::from_str(&long).is_err());
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn parse_abstract() {
        let e = Endpoint::from_str("@t3-relay").unwrap();
        assert_eq!(e, Endpoint::Unix(UnixAddr::Abstract(b"t3-relay".to_vec())));
        assert_eq!(e.to_string(), "@t3-relay");
        round_trip("@t3-relay");
        assert!(Endpoint::from_str("@").is_err());
    }

    #[test]
    fn reject_empty() {
        assert!(Endpoint::from_str("").is_err());
    }

    #[test]
    fn unnamed_peer_renders() {
        let e = Endpoint::Unix(UnixAddr::Unnamed);
        assert_eq!(e.to_string(), "(unnamed)");
        assert!(!e.is_tcp());
        assert_eq!(e.tcp_addr(), None);
    }

    #[test]
    fn domain_names_are_paths() {
        // name resolution is out of scope, a hostname is taken literally
        let e = Endpoint::from_str("localhost:9000").unwrap();
        assert!(!e.is_tcp());
    }
}
