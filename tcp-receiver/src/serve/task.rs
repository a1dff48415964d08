/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::io;
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::time::Instant;

use t3_io_ext::PeerStream;
use t3_types::net::Endpoint;

use crate::spool::Spool;

const BUFFER_SIZE: usize = 32 * 1024;

#[derive(Error, Debug)]
pub(crate) enum ServerTaskError {
    #[error("receive failed: {0:?}")]
    ReceiveFailed(io::Error),
    #[error("file write failed: {0:?}")]
    WriteFailed(io::Error),
    #[error("file rotation failed: {0:?}")]
    RotateFailed(io::Error),
    #[error("idle for {0:?}")]
    Idle(Duration),
}

/// One capture session: a peer stream feeding the connection's spool.
///
/// Exactly one receive is in flight, and the next receive is issued only
/// after the spool write for the previous chunk completed. The watchdog
/// deadline is re-armed on every receive issuance; the file-age deadline
/// runs independently while a staging file is open.
pub(crate) struct IngestTask {
    timeout: Duration,
    peer: Endpoint,
    connection_index: usize,
}

impl IngestTask {
    pub(crate) fn new(timeout: Duration, peer: Endpoint, connection_index: usize) -> Self {
        IngestTask {
            timeout,
            peer,
            connection_index,
        }
    }

    pub(crate) async fn into_running(self, stream: PeerStream, mut spool: Spool) {
        match self.run(stream, &mut spool).await {
            Ok(_) => debug!(
                "slot {}: session with {} finished",
                self.connection_index, self.peer
            ),
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
        }
        spool.finish().await;
    }

    async fn run(
        &self,
        mut stream: PeerStream,
        spool: &mut Spool,
    ) -> Result<(), ServerTaskError> {
        let mut buf = vec![0u8; BUFFER_SIZE].into_boxed_slice();
        let mut read_deadline = Instant::now() + self.timeout;

        loop {
            let age_deadline = spool.age_deadline();
            tokio::select! {
                biased;

                r = stream.read(&mut buf) => {
                    match r {
                        Ok(0) => return Ok(()),
                        Ok(n) => {
                            debug!(
                                "slot {}: received {n} byte(s)",
                                self.connection_index
                            );
                            spool
                                .write(&buf[..n])
                                .await
                                .map_err(ServerTaskError::WriteFailed)?;
                            read_deadline = Instant::now() + self.timeout;
                        }
                        Err(e) => return Err(ServerTaskError::ReceiveFailed(e)),
                    }
                }
                _ = tokio::time::sleep_until(read_deadline) => {
                    return Err(ServerTaskError::Idle(self.timeout));
                }
                _ = tokio::time::sleep_until(age_deadline.unwrap_or(read_deadline)),
                        if age_deadline.is_some() => {
                    spool.rotate().await.map_err(ServerTaskError::RotateFailed)?;
                }
            }
        }
    }
}
