/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use anyhow::Context;
use log::error;

use t3_daemon::runtime::RuntimeConfig;

fn main() -> anyhow::Result<()> {
    let Some(proc_args) =
        tcp_proxy::opts::parse_clap().context("failed to parse command line options")?
    else {
        return Ok(());
    };

    t3_stdlog::setup(proc_args.daemon_config.verbose_level).context("failed to setup logger")?;

    let mut runtime_config = RuntimeConfig::new();
    runtime_config.set_thread_number(proc_args.thread_number)?;
    let rt = runtime_config.start().context("failed to start runtime")?;

    let ret = rt.block_on(tcp_proxy::run(&proc_args));
    if let Err(e) = &ret {
        error!("{e:?}");
    }
    ret
}
