/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use t3_daemon::listen::StreamAcceptServer;
use t3_io_ext::PeerStream;
use t3_types::net::Endpoint;

use crate::spool::{FileSequences, Spool, SpoolConfig};

mod task;
use task::IngestTask;

/// The capture server configuration shared by all acceptor slots.
pub struct ReceiverServer {
    timeout: Duration,
    spool_config: Arc<SpoolConfig>,
    sequences: Arc<FileSequences>,
}

impl ReceiverServer {
    pub fn new(spool_config: SpoolConfig, timeout: Duration) -> Self {
        ReceiverServer {
            timeout,
            spool_config: Arc::new(spool_config),
            sequences: Arc::new(FileSequences::new()),
        }
    }
}

#[async_trait]
impl StreamAcceptServer for ReceiverServer {
    fn name(&self) -> &'static str {
        crate::build::PKG_NAME
    }

    async fn run_stream_task(&self, stream: PeerStream, peer: Endpoint, connection_index: usize) {
        let spool = Spool::new(
            self.spool_config.clone(),
            self.sequences.clone(),
            connection_index,
        );
        let task = IngestTask::new(self.timeout, peer, connection_index);
        task.into_running(stream, spool).await
    }
}
