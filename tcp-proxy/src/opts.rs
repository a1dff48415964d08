/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{value_parser, Arg, Command};

use t3_daemon::opts::{DaemonArgs, DaemonArgsExt};
use t3_types::net::Endpoint;

const ARG_THREAD_NUMBER: &str = "thread-number";
const ARG_CONNECTIONS: &str = "connections-per-acceptor";
const ARG_TIMEOUT: &str = "timeout";
const ARG_LOCAL_ENDPOINT: &str = "local-endpoint";
const ARG_REMOTE_ENDPOINT: &str = "remote-endpoint";

/// Minimum number of connections per acceptor.
pub const MIN_CONNECTIONS: u64 = 1;

/// Maximum number of connections per acceptor.
pub const MAX_CONNECTIONS: u64 = 4096;

/// Default number of connections per acceptor.
pub const DEFAULT_CONNECTIONS: u64 = 256;

/// Minimum connection timeout (seconds).
pub const MIN_TIMEOUT: u64 = 5;

/// Maximum connection timeout (seconds).
pub const MAX_TIMEOUT: u64 = 24 * 60 * 60;

/// Default connection timeout (seconds).
pub const DEFAULT_TIMEOUT: u64 = 30;

#[derive(Debug)]
pub struct ProcArgs {
    pub daemon_config: DaemonArgs,
    pub local: Endpoint,
    pub remote: Endpoint,
    pub thread_number: usize,
    pub connections_per_acceptor: usize,
    pub timeout: Duration,
}

fn build_cli_args() -> Command {
    Command::new(crate::build::PKG_NAME)
        .append_daemon_args()
        .arg(
            Arg::new(ARG_THREAD_NUMBER)
                .help("Number of worker threads")
                .value_name("NUMBER")
                .long(ARG_THREAD_NUMBER)
                .num_args(1)
                .value_parser(value_parser!(u64).range(
                    t3_daemon::runtime::MIN_THREADS as u64
                        ..=t3_daemon::runtime::MAX_THREADS as u64
                ))
                .default_value("4"),
        )
        .arg(
            Arg::new(ARG_CONNECTIONS)
                .help("Number of pre-armed connections per acceptor")
                .value_name("NUMBER")
                .long(ARG_CONNECTIONS)
                .num_args(1)
                .value_parser(value_parser!(u64).range(MIN_CONNECTIONS..=MAX_CONNECTIONS))
                .default_value("256"),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .help("Connection timeout, in seconds or humanized (\"30s\", \"2m\")")
                .value_name("TIMEOUT")
                .long(ARG_TIMEOUT)
                .num_args(1)
                .default_value("30"),
        )
        .arg(
            Arg::new(ARG_LOCAL_ENDPOINT)
                .help("Endpoint to listen on")
                .value_name("LOCAL ENDPOINT")
                .num_args(1)
                .required_unless_present("version"),
        )
        .arg(
            Arg::new(ARG_REMOTE_ENDPOINT)
                .help("Endpoint to relay to")
                .value_name("REMOTE ENDPOINT")
                .num_args(1)
                .required_unless_present("version"),
        )
}

pub fn parse_clap() -> anyhow::Result<Option<ProcArgs>> {
    let args = build_cli_args().get_matches();

    let mut daemon_config = DaemonArgs::new();
    daemon_config.parse_clap(&args);
    if daemon_config.print_version {
        crate::build::print_version();
        return Ok(None);
    }

    let local = args.get_one::<String>(ARG_LOCAL_ENDPOINT).unwrap();
    let local = Endpoint::from_str(local).context(format!("invalid local endpoint {local}"))?;
    let remote = args.get_one::<String>(ARG_REMOTE_ENDPOINT).unwrap();
    let remote = Endpoint::from_str(remote).context(format!("invalid remote endpoint {remote}"))?;

    let thread_number = *args.get_one::<u64>(ARG_THREAD_NUMBER).unwrap() as usize;
    let connections_per_acceptor = *args.get_one::<u64>(ARG_CONNECTIONS).unwrap() as usize;
    let timeout = t3_clap::humanize::get_duration(&args, ARG_TIMEOUT)?
        .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT));
    if !(Duration::from_secs(MIN_TIMEOUT)..=Duration::from_secs(MAX_TIMEOUT)).contains(&timeout) {
        return Err(anyhow!(
            "timeout {timeout:?} out of range {MIN_TIMEOUT}s..={MAX_TIMEOUT}s"
        ));
    }

    Ok(Some(ProcArgs {
        daemon_config,
        local,
        remote,
        thread_number,
        connections_per_acceptor,
        timeout,
    }))
}
