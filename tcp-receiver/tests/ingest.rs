/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use t3_daemon::listen::Acceptors;
use t3_types::net::Endpoint;
use tcp_receiver::spool::SpoolConfig;
use tcp_receiver::ReceiverServer;

struct TestDirs {
    _root: tempfile::TempDir,
    staging: std::path::PathBuf,
    final_dir: std::path::PathBuf,
}

fn test_dirs() -> TestDirs {
    let root = tempfile::tempdir().unwrap();
    let staging = root.path().join("staging");
    let final_dir = root.path().join("final");
    std::fs::create_dir(&staging).unwrap();
    std::fs::create_dir(&final_dir).unwrap();
    TestDirs {
        _root: root,
        staging,
        final_dir,
    }
}

fn spawn_receiver(
    acceptors: &mut Acceptors,
    dirs: &TestDirs,
    max_file_size: u64,
    max_file_age: Duration,
    timeout: Duration,
    slots: usize,
) -> std::net::SocketAddr {
    let config = SpoolConfig {
        staging_dir: dirs.staging.clone(),
        final_dir: dirs.final_dir.clone(),
        max_file_size,
        max_file_age,
    };
    let server = Arc::new(ReceiverServer::new(config, timeout));
    let (bound, _stats) = acceptors
        .listen(&Endpoint::from_str("127.0.0.1:0").unwrap(), server, slots)
        .unwrap();
    bound.tcp_addr().unwrap()
}

/// Final-dir contents ordered by (connection, sequence).
fn collect_final_files(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let mut entries: Vec<(usize, u64, String)> = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let name = entry.unwrap().file_name().into_string().unwrap();
        let trimmed = name
            .strip_prefix("file-")
            .and_then(|s| s.strip_suffix(".bin"))
            .unwrap_or_else(|| panic!("unexpected file name {name}"));
        let mut it = trimmed.split('-');
        let cx: usize = it.next().unwrap().parse().unwrap();
        let fx: u64 = it.next().unwrap().parse().unwrap();
        entries.push((cx, fx, name));
    }
    entries.sort();
    entries
        .into_iter()
        .map(|(_, _, name)| {
            let data = std::fs::read(dir.join(&name)).unwrap();
            (name, data)
        })
        .collect()
}

async fn wait_for_final_bytes(dir: &Path, want: u64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let total: u64 = collect_final_files(dir).iter().map(|(_, d)| d.len() as u64).sum();
            if total >= want {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("final directory never reached the expected byte count");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rotates_by_size_and_reassembles() {
    let dirs = test_dirs();
    let mut acceptors = Acceptors::new();
    let addr = spawn_receiver(
        &mut acceptors,
        &dirs,
        4096,
        Duration::from_secs(3600),
        Duration::from_secs(30),
        1,
    );

    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 241) as u8).collect();
    let mut client = TcpStream::connect(addr).await.unwrap();
    for chunk in payload.chunks(2000) {
        client.write_all(chunk).await.unwrap();
        // give the receiver time to drain each chunk separately
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    client.shutdown().await.unwrap();
    drop(client);

    wait_for_final_bytes(&dirs.final_dir, 10_000).await;
    let files = collect_final_files(&dirs.final_dir);
    assert!(files.len() >= 2, "expected at least two rotated files");
    for (name, data) in &files {
        assert!(
            (data.len() as u64) <= 4096 + 32 * 1024,
            "{name} grew past the rotation bound"
        );
    }
    let reassembled: Vec<u8> = files.into_iter().flat_map(|(_, d)| d).collect();
    assert_eq!(reassembled, payload);
    assert!(std::fs::read_dir(&dirs.staging).unwrap().next().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rotates_by_age() {
    let dirs = test_dirs();
    let mut acceptors = Acceptors::new();
    let addr = spawn_receiver(
        &mut acceptors,
        &dirs,
        1 << 30,
        Duration::from_secs(1),
        Duration::from_secs(30),
        1,
    );

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(&[b'a'; 100]).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    // the first file must have been promoted by age alone
    wait_for_final_bytes(&dirs.final_dir, 100).await;

    client.write_all(&[b'b'; 100]).await.unwrap();
    client.shutdown().await.unwrap();
    drop(client);

    wait_for_final_bytes(&dirs.final_dir, 200).await;
    let files = collect_final_files(&dirs.final_dir);
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].1, vec![b'a'; 100]);
    assert_eq!(files[1].1, vec![b'b'; 100]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watchdog_promotes_and_closes_silent_connection() {
    let dirs = test_dirs();
    let mut acceptors = Acceptors::new();
    let addr = spawn_receiver(
        &mut acceptors,
        &dirs,
        1 << 30,
        Duration::from_secs(3600),
        Duration::from_secs(1),
        1,
    );

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(&[b'x'; 50]).await.unwrap();
    // stay connected but silent, the watchdog has to close the session
    wait_for_final_bytes(&dirs.final_dir, 50).await;

    let files = collect_final_files(&dirs.final_dir);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].1.len(), 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sequences_continue_across_sessions_of_a_slot() {
    let dirs = test_dirs();
    let mut acceptors = Acceptors::new();
    let addr = spawn_receiver(
        &mut acceptors,
        &dirs,
        1 << 30,
        Duration::from_secs(3600),
        Duration::from_secs(30),
        1,
    );

    for round in 0..2u8 {
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(&[round; 10]).await.unwrap();
        client.shutdown().await.unwrap();
        drop(client);
        wait_for_final_bytes(&dirs.final_dir, (round as u64 + 1) * 10).await;
    }

    let files = collect_final_files(&dirs.final_dir);
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].0, "file-0-1.bin");
    assert_eq!(files[1].0, "file-0-2.bin");
}
