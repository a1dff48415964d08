/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use t3_daemon::listen::Acceptors;
use t3_types::net::Endpoint;
use tcp_proxy::ProxyServer;

/// An upstream echoing every byte back, one task per connection.
async fn spawn_echo_origin() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                loop {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if stream.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });
    addr
}

fn spawn_proxy(
    acceptors: &mut Acceptors,
    remote: SocketAddr,
    timeout: Duration,
    slots: usize,
) -> SocketAddr {
    let server = Arc::new(ProxyServer::new(Endpoint::Tcp(remote), timeout));
    let (bound, _stats) = acceptors
        .listen(&Endpoint::from_str("127.0.0.1:0").unwrap(), server, slots)
        .unwrap();
    bound.tcp_addr().unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn relay_round_trip_and_slot_rearm() {
    let origin = spawn_echo_origin().await;
    let mut acceptors = Acceptors::new();
    let proxy = spawn_proxy(&mut acceptors, origin, Duration::from_secs(5), 1);

    let mut client = TcpStream::connect(proxy).await.unwrap();
    client.write_all(b"HELLO").await.unwrap();
    let mut buf = [0u8; 5];
    timeout(Duration::from_secs(1), client.read_exact(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf, b"HELLO");
    drop(client);

    // the single slot must re-arm once the previous session ended
    let mut client = TcpStream::connect(proxy).await.unwrap();
    client.write_all(b"WORLD").await.unwrap();
    timeout(Duration::from_secs(2), client.read_exact(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf, b"WORLD");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bulk_transfer_preserves_bytes_in_order() {
    let origin = spawn_echo_origin().await;
    let mut acceptors = Acceptors::new();
    let proxy = spawn_proxy(&mut acceptors, origin, Duration::from_secs(5), 4);

    let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let expected = payload.clone();

    let mut client = TcpStream::connect(proxy).await.unwrap();
    let (mut rd, mut wr) = client.split();
    let write = async {
        wr.write_all(&payload).await.unwrap();
        wr.shutdown().await.unwrap();
    };
    let read = async {
        let mut echoed = vec![0u8; expected.len()];
        rd.read_exact(&mut echoed).await.unwrap();
        echoed
    };
    let (_, echoed) = timeout(Duration::from_secs(10), async { tokio::join!(write, read) })
        .await
        .unwrap();
    assert_eq!(echoed, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn half_close_from_origin_reaches_client() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            // write a short burst, then close without reading
            let _ = stream.write_all(b"AB").await;
        }
    });

    let mut acceptors = Acceptors::new();
    let proxy = spawn_proxy(&mut acceptors, origin, Duration::from_secs(5), 1);

    let mut client = TcpStream::connect(proxy).await.unwrap();
    let mut received = Vec::new();
    timeout(Duration::from_secs(2), client.read_to_end(&mut received))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received, b"AB");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watchdog_closes_silent_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            held.push(stream);
        }
    });

    let mut acceptors = Acceptors::new();
    let proxy = spawn_proxy(&mut acceptors, origin, Duration::from_secs(1), 1);

    let start = tokio::time::Instant::now();
    let mut client = TcpStream::connect(proxy).await.unwrap();
    let mut buf = [0u8; 16];
    let n = timeout(Duration::from_secs(5), client.read(&mut buf))
        .await
        .expect("watchdog did not fire")
        .unwrap();
    assert_eq!(n, 0);
    assert!(start.elapsed() >= Duration::from_millis(900));
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn relay_over_unix_listener() {
    let origin = spawn_echo_origin().await;
    let dir = tempfile::tempdir().unwrap();
    let sock_path = dir.path().join("relay.sock");

    let server = Arc::new(ProxyServer::new(
        Endpoint::Tcp(origin),
        Duration::from_secs(5),
    ));
    let mut acceptors = Acceptors::new();
    let endpoint = Endpoint::from_str(sock_path.to_str().unwrap()).unwrap();
    acceptors.listen(&endpoint, server, 1).unwrap();

    let mut client = t3_io_ext::PeerStream::connect(&endpoint).await.unwrap();
    client.write_all(b"HELLO").await.unwrap();
    let mut buf = [0u8; 5];
    timeout(Duration::from_secs(1), client.read_exact(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf, b"HELLO");
}

#[cfg(target_os = "linux")]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn relay_over_abstract_listener() {
    let origin = spawn_echo_origin().await;

    let server = Arc::new(ProxyServer::new(
        Endpoint::Tcp(origin),
        Duration::from_secs(5),
    ));
    let mut acceptors = Acceptors::new();
    let name = format!("@tcp-proxy-test-{}", std::process::id());
    let endpoint = Endpoint::from_str(&name).unwrap();
    acceptors.listen(&endpoint, server, 1).unwrap();

    let mut client = t3_io_ext::PeerStream::connect(&endpoint).await.unwrap();
    client.write_all(b"ping").await.unwrap();
    let mut buf = [0u8; 4];
    timeout(Duration::from_secs(1), client.read_exact(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf, b"ping");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_upstream_connect_rearms_slot() {
    // a port nothing listens on
    let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = dead.local_addr().unwrap();
    drop(dead);

    let mut acceptors = Acceptors::new();
    let proxy = spawn_proxy(&mut acceptors, dead_addr, Duration::from_secs(1), 1);

    for _ in 0..2 {
        let mut client = TcpStream::connect(proxy).await.unwrap();
        let mut buf = [0u8; 16];
        let n = timeout(Duration::from_secs(3), client.read(&mut buf))
            .await
            .unwrap()
            .unwrap_or(0);
        assert_eq!(n, 0);
    }
}
