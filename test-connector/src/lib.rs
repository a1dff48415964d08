/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use anyhow::{anyhow, Context};
use bytes::Bytes;
use log::{debug, warn};
use tokio::io::AsyncWriteExt;

use t3_io_ext::PeerStream;
use t3_types::net::Endpoint;

mod build;

pub mod opts;
use opts::ProcArgs;

struct ConnectionContext {
    id: usize,
    address: Endpoint,
    payload: Bytes,
    number_transfers: usize,
    number_loops: usize,
}

impl ConnectionContext {
    /// Run every loop of this connection: connect, send the payload
    /// `number_transfers` times, disconnect. Returns the byte total.
    async fn into_running(self) -> anyhow::Result<u64> {
        let mut total: u64 = 0;
        for nloop in 0..self.number_loops {
            let mut stream = PeerStream::connect(&self.address)
                .await
                .context(format!(
                    "connection {} loop {nloop}: connect to {} failed",
                    self.id, self.address
                ))?;
            for _ in 0..self.number_transfers {
                stream.write_all(&self.payload).await.context(format!(
                    "connection {} loop {nloop}: send failed",
                    self.id
                ))?;
                total += self.payload.len() as u64;
            }
            stream.shutdown().await.context(format!(
                "connection {} loop {nloop}: disconnect failed",
                self.id
            ))?;
            debug!("connection {} loop {nloop} finished", self.id);
        }
        Ok(total)
    }
}

/// Drive all connections to completion and report the totals.
pub async fn run(proc_args: &ProcArgs) -> anyhow::Result<()> {
    let mut handles = Vec::with_capacity(proc_args.number_connections);
    for id in 0..proc_args.number_connections {
        let context = ConnectionContext {
            id,
            address: proc_args.address.clone(),
            payload: proc_args.payload.clone(),
            number_transfers: proc_args.number_transfers,
            number_loops: proc_args.number_loops,
        };
        handles.push(tokio::spawn(context.into_running()));
    }

    let mut total: u64 = 0;
    let mut failed: usize = 0;
    for handle in handles {
        match handle.await {
            Ok(Ok(sent)) => total += sent,
            Ok(Err(e)) => {
                failed += 1;
                warn!("{e:?}");
            }
            Err(e) => {
                failed += 1;
                warn!("connection task panicked: {e}");
            }
        }
    }

    println!(
        "Sent {total} byte(s) over {} connection(s), {} transfer(s) x {} loop(s) each",
        proc_args.number_connections, proc_args.number_transfers, proc_args.number_loops
    );
    if failed > 0 {
        return Err(anyhow!("{failed} connection(s) failed"));
    }
    Ok(())
}
