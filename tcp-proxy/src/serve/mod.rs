/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::time::Duration;

use async_trait::async_trait;

use t3_daemon::listen::StreamAcceptServer;
use t3_io_ext::{PeerStream, StreamCopyConfig};
use t3_types::net::Endpoint;

mod task;
use task::RelayTask;

/// The relay server configuration shared by all acceptor slots.
pub struct ProxyServer {
    remote: Endpoint,
    timeout: Duration,
    copy_config: StreamCopyConfig,
}

impl ProxyServer {
    pub fn new(remote: Endpoint, timeout: Duration) -> Self {
        ProxyServer {
            remote,
            timeout,
            copy_config: StreamCopyConfig::default(),
        }
    }
}

#[async_trait]
impl StreamAcceptServer for ProxyServer {
    fn name(&self) -> &'static str {
        crate::build::PKG_NAME
    }

    async fn run_stream_task(&self, stream: PeerStream, peer: Endpoint, connection_index: usize) {
        let task = RelayTask::new(
            self.remote.clone(),
            self.timeout,
            self.copy_config,
            peer,
            connection_index,
        );
        task.into_running(stream).await
    }
}
