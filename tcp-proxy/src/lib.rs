/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use log::info;
use tokio::sync::Notify;

use t3_daemon::listen::Acceptors;
use t3_daemon::signal::AsyncSignalAction;

mod build;

pub mod opts;
use opts::ProcArgs;

mod serve;
pub use serve::ProxyServer;

static QUIT_NOTIFY: Notify = Notify::const_new();

#[derive(Clone, Copy)]
struct QuitAction;

impl AsyncSignalAction for QuitAction {
    fn run(&self) -> impl Future<Output = ()> + Send {
        async { QUIT_NOTIFY.notify_one() }
    }
}

pub async fn run(proc_args: &ProcArgs) -> anyhow::Result<()> {
    t3_daemon::signal::register_quit(QuitAction).context("failed to setup signal handler")?;

    let server = Arc::new(ProxyServer::new(proc_args.remote.clone(), proc_args.timeout));

    let mut acceptors = Acceptors::new();
    acceptors.listen(
        &proc_args.local,
        server,
        proc_args.connections_per_acceptor,
    )?;

    info!("waiting for signal to arrive");
    QUIT_NOTIFY.notified().await;
    info!("signal received, going offline");

    acceptors
        .wait_offline(t3_daemon::listen::DEFAULT_OFFLINE_GRACE)
        .await;
    Ok(())
}
