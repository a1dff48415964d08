/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::future::{poll_fn, Future};

use anyhow::anyhow;
use log::info;
use tokio::signal::unix::{signal, SignalKind};

pub trait AsyncSignalAction: Copy {
    fn run(&self) -> impl Future<Output = ()> + Send;
}

/// Register the quit signals (SIGINT, SIGQUIT and SIGTERM) against one
/// async action. The action runs at most once per signal delivery.
pub fn register_quit<QUIT>(do_quit: QUIT) -> anyhow::Result<()>
where
    QUIT: AsyncSignalAction + Send + 'static,
{
    let mut int_sig = signal(SignalKind::interrupt())
        .map_err(|e| anyhow!("failed to create SIGINT listener: {e}"))?;
    tokio::spawn(async move {
        if poll_fn(|cx| int_sig.poll_recv(cx)).await.is_some() {
            info!("got quit signal");
            do_quit.run().await;
        }
    });

    let mut quit_sig = signal(SignalKind::quit())
        .map_err(|e| anyhow!("failed to create SIGQUIT listener: {e}"))?;
    tokio::spawn(async move {
        if poll_fn(|cx| quit_sig.poll_recv(cx)).await.is_some() {
            info!("got quit signal");
            do_quit.run().await;
        }
    });

    let mut term_sig = signal(SignalKind::terminate())
        .map_err(|e| anyhow!("failed to create SIGTERM listener: {e}"))?;
    tokio::spawn(async move {
        if poll_fn(|cx| term_sig.poll_recv(cx)).await.is_some() {
            info!("got quit signal");
            do_quit.run().await;
        }
    });

    Ok(())
}
