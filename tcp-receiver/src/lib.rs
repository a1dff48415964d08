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

pub mod spool;
use spool::SpoolConfig;

mod serve;
pub use serve::ReceiverServer;

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

    let spool_config = SpoolConfig {
        staging_dir: proc_args.staging_dir.clone(),
        final_dir: proc_args.final_dir.clone(),
        max_file_size: proc_args.max_file_size,
        max_file_age: proc_args.max_file_age,
    };
    let server = Arc::new(ReceiverServer::new(spool_config, proc_args.timeout));

    let mut acceptors = Acceptors::new();
    acceptors.listen(
        &proc_args.listen,
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
