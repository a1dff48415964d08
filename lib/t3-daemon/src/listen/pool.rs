/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use t3_io_ext::{PeerStream, StreamListener};
use t3_types::net::Endpoint;

use super::ListenStats;

/// How long sessions still running after going offline are given to end
/// on their own.
pub const DEFAULT_OFFLINE_GRACE: Duration = Duration::from_secs(4);

/// Server side of an acceptor pool: runs one accepted session to
/// completion. The slot that accepted the stream re-arms its accept only
/// after this returns.
#[async_trait]
pub trait StreamAcceptServer {
    fn name(&self) -> &'static str;

    async fn run_stream_task(&self, stream: PeerStream, peer: Endpoint, connection_index: usize);
}

/// A fixed pool of pre-armed connection slots over one shared listener.
///
/// Every slot task loops accept, serve, accept again, so per listening
/// endpoint at most `connections_per_acceptor` sessions are live and a
/// fresh accept is armed the moment a session ends.
pub struct AcceptorPool<S> {
    server: Arc<S>,
    stats: Arc<ListenStats>,
    acceptor_index: usize,
    connections_per_acceptor: usize,
}

impl<S> AcceptorPool<S>
where
    S: StreamAcceptServer + Send + Sync + 'static,
{
    pub fn new(server: Arc<S>, acceptor_index: usize, connections_per_acceptor: usize) -> Self {
        AcceptorPool {
            server,
            stats: Arc::new(ListenStats::new()),
            acceptor_index,
            connections_per_acceptor,
        }
    }

    pub fn stats(&self) -> Arc<ListenStats> {
        self.stats.clone()
    }

    pub fn spawn(
        &self,
        listener: StreamListener,
        quit_receiver: &watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        let listener = Arc::new(listener);
        (0..self.connections_per_acceptor)
            .map(|slot| {
                let listener = listener.clone();
                let server = self.server.clone();
                let stats = self.stats.clone();
                let mut quit_receiver = quit_receiver.clone();
                let connection_index =
                    self.acceptor_index * self.connections_per_acceptor + slot;
                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            biased;

                            _ = quit_receiver.changed() => break,
                            r = listener.accept() => {
                                match r {
                                    Ok((stream, peer)) => {
                                        stats.add_accepted();
                                        stats.inc_alive_task();
                                        debug!(
                                            "{} slot {connection_index}: connection from {peer}",
                                            server.name()
                                        );
                                        server
                                            .run_stream_task(stream, peer, connection_index)
                                            .await;
                                        stats.dec_alive_task();
                                    }
                                    Err(e) => {
                                        stats.add_failed();
                                        warn!(
                                            "{} slot {connection_index} accept: {e:?}",
                                            server.name()
                                        );
                                        // a persistent accept failure (EMFILE and
                                        // friends) must not spin the worker
                                        tokio::time::sleep(Duration::from_millis(100)).await;
                                    }
                                }
                            }
                        }
                        if *quit_receiver.borrow() {
                            break;
                        }
                    }
                })
            })
            .collect()
    }
}

/// Registry owning every acceptor pool of the process.
pub struct Acceptors {
    handles: Vec<JoinHandle<()>>,
    next_index: usize,
    quit_sender: watch::Sender<bool>,
}

impl Default for Acceptors {
    fn default() -> Self {
        let (quit_sender, _) = watch::channel(false);
        Acceptors {
            handles: Vec::new(),
            next_index: 0,
            quit_sender,
        }
    }
}

impl Acceptors {
    pub fn new() -> Self {
        Acceptors::default()
    }

    /// Bind `endpoint` and spawn a pre-armed pool serving it. Returns the
    /// endpoint actually bound (relevant when an ephemeral port was
    /// requested) and the accept counters of the pool.
    pub fn listen<S>(
        &mut self,
        endpoint: &Endpoint,
        server: Arc<S>,
        connections_per_acceptor: usize,
    ) -> anyhow::Result<(Endpoint, Arc<ListenStats>)>
    where
        S: StreamAcceptServer + Send + Sync + 'static,
    {
        let listener =
            StreamListener::bind(endpoint).context(format!("failed to listen on {endpoint}"))?;
        let bound = listener
            .local_endpoint()
            .context(format!("failed to get local address bound for {endpoint}"))?;
        let pool = AcceptorPool::new(server, self.next_index, connections_per_acceptor);
        let stats = pool.stats();
        self.handles
            .extend(pool.spawn(listener, &self.quit_sender.subscribe()));
        info!("listening on {bound}, {connections_per_acceptor} slots pre-armed");
        self.next_index += 1;
        Ok((bound, stats))
    }

    /// Stop accepting. Sessions already running are left to finish.
    pub fn set_offline(&self) {
        let _ = self.quit_sender.send(true);
    }

    /// Go offline and wait up to `grace` for running sessions to end,
    /// aborting whatever is still alive afterwards.
    pub async fn wait_offline(mut self, grace: Duration) {
        self.set_offline();
        let deadline = Instant::now() + grace;
        for mut handle in std::mem::take(&mut self.handles) {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                handle.abort();
            }
        }
    }

    pub fn abort_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for Acceptors {
    fn drop(&mut self) {
        self.abort_all();
    }
}
