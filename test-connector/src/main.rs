/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use anyhow::Context;
use log::error;

use t3_daemon::runtime::RuntimeConfig;

fn main() -> anyhow::Result<()> {
    let Some(proc_args) =
        test_connector::opts::parse_clap().context("failed to parse command line options")?
    else {
        return Ok(());
    };

    t3_stdlog::setup(proc_args.daemon_config.verbose_level).context("failed to setup logger")?;

    let rt = RuntimeConfig::new()
        .start()
        .context("failed to start runtime")?;

    let ret = rt.block_on(test_connector::run(&proc_args));
    if let Err(e) = &ret {
        error!("{e:?}");
    }
    ret
}
