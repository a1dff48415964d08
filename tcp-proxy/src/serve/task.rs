/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::io;
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;
use tokio::time::Instant;

use t3_io_ext::{PeerStream, StreamCopy, StreamCopyConfig, StreamCopyError};
use t3_types::net::Endpoint;

#[derive(Error, Debug)]
pub(crate) enum ServerTaskError {
    #[error("upstream connect failed: {0:?}")]
    UpstreamConnectFailed(io::Error),
    #[error("upstream connect timed out")]
    UpstreamConnectTimeout,
    #[error("closed by client")]
    ClosedByClient,
    #[error("closed by upstream")]
    ClosedByUpstream,
    #[error("client read failed: {0:?}")]
    ClientReadFailed(io::Error),
    #[error("client write failed: {0:?}")]
    ClientWriteFailed(io::Error),
    #[error("upstream read failed: {0:?}")]
    UpstreamReadFailed(io::Error),
    #[error("upstream write failed: {0:?}")]
    UpstreamWriteFailed(io::Error),
    #[error("idle for {0:?}")]
    Idle(Duration),
}

/// One relayed session: a client stream paired with an upstream stream.
///
/// Dropping the task closes both legs, after which the owning acceptor
/// slot re-arms its accept.
pub(crate) struct RelayTask {
    remote: Endpoint,
    timeout: Duration,
    copy_config: StreamCopyConfig,
    peer: Endpoint,
    connection_index: usize,
}

impl RelayTask {
    pub(crate) fn new(
        remote: Endpoint,
        timeout: Duration,
        copy_config: StreamCopyConfig,
        peer: Endpoint,
        connection_index: usize,
    ) -> Self {
        RelayTask {
            remote,
            timeout,
            copy_config,
            peer,
            connection_index,
        }
    }

    pub(crate) async fn into_running(self, clt_stream: PeerStream) {
        match self.run(clt_stream).await {
            Err(ServerTaskError::ClosedByClient) | Err(ServerTaskError::ClosedByUpstream) => {
                debug!(
                    "slot {}: session with {} finished",
                    self.connection_index, self.peer
                );
            }
            Err(ServerTaskError::Idle(timeout)) => {
                info!(
                    "slot {}: session with {} idle for {timeout:?}, closing",
                    self.connection_index, self.peer
                );
            }
            Err(e) => {
                warn!(
                    "slot {}: session with {}: {e}",
                    self.connection_index, self.peer
                );
            }
            Ok(_) => {}
        }
    }

    async fn run(&self, clt_stream: PeerStream) -> Result<(), ServerTaskError> {
        let ups_stream = tokio::time::timeout(self.timeout, PeerStream::connect(&self.remote))
            .await
            .map_err(|_| ServerTaskError::UpstreamConnectTimeout)?
            .map_err(ServerTaskError::UpstreamConnectFailed)?;
        debug!(
            "slot {}: relaying {} -> {}",
            self.connection_index, self.peer, self.remote
        );

        let (mut clt_r, mut clt_w) = clt_stream.into_split();
        let (mut ups_r, mut ups_w) = ups_stream.into_split();

        let mut clt_to_ups = StreamCopy::new(&mut clt_r, &mut ups_w, &self.copy_config);
        let mut ups_to_clt = StreamCopy::new(&mut ups_r, &mut clt_w, &self.copy_config);

        let mut idle_interval =
            tokio::time::interval_at(Instant::now() + self.timeout, self.timeout);
        loop {
            tokio::select! {
                biased;

                r = &mut clt_to_ups => {
                    let _ = ups_to_clt.write_flush().await;
                    debug!(
                        "slot {}: {} byte(s) up, {} byte(s) down",
                        self.connection_index,
                        clt_to_ups.copied_size(),
                        ups_to_clt.copied_size()
                    );
                    return match r {
                        Ok(_) => Err(ServerTaskError::ClosedByClient),
                        Err(StreamCopyError::ReadFailed(e)) => {
                            Err(ServerTaskError::ClientReadFailed(e))
                        }
                        Err(StreamCopyError::WriteFailed(e)) => {
                            Err(ServerTaskError::UpstreamWriteFailed(e))
                        }
                    };
                }
                r = &mut ups_to_clt => {
                    let _ = clt_to_ups.write_flush().await;
                    debug!(
                        "slot {}: {} byte(s) up, {} byte(s) down",
                        self.connection_index,
                        clt_to_ups.copied_size(),
                        ups_to_clt.copied_size()
                    );
                    return match r {
                        Ok(_) => Err(ServerTaskError::ClosedByUpstream),
                        Err(StreamCopyError::ReadFailed(e)) => {
                            Err(ServerTaskError::UpstreamReadFailed(e))
                        }
                        Err(StreamCopyError::WriteFailed(e)) => {
                            Err(ServerTaskError::ClientWriteFailed(e))
                        }
                    };
                }
                _ = idle_interval.tick() => {
                    if clt_to_ups.is_idle() && ups_to_clt.is_idle() {
                        return Err(ServerTaskError::Idle(self.timeout));
                    }
                    clt_to_ups.reset_active();
                    ups_to_clt.reset_active();
                }
            }
        }
    }
}
