/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{value_parser, Arg, Command, ValueHint};

use t3_daemon::opts::{DaemonArgs, DaemonArgsExt};
use t3_types::net::Endpoint;

const ARG_THREAD_NUMBER: &str = "thread-number";
const ARG_CONNECTIONS: &str = "connections-per-acceptor";
const ARG_TIMEOUT: &str = "timeout";
const ARG_MAX_FILE_SIZE: &str = "max-file-size";
const ARG_MAX_FILE_AGE: &str = "max-file-age";
const ARG_LISTEN_ENDPOINT: &str = "listen-endpoint";
const ARG_STAGING_DIR: &str = "staging-dir";
const ARG_FINAL_DIR: &str = "final-dir";

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

/// Minimum file size (bytes).
pub const MIN_FILE_SIZE: u64 = 4 * 1024;

/// Maximum file size (bytes).
pub const MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// Default file size (bytes).
pub const DEFAULT_FILE_SIZE: u64 = 32 * 1024 * 1024;

/// Minimum file age (seconds).
pub const MIN_FILE_AGE: u64 = 1;

/// Maximum file age (seconds).
pub const MAX_FILE_AGE: u64 = 3600;

/// Default file age (seconds).
pub const DEFAULT_FILE_AGE: u64 = 300;

#[derive(Debug)]
pub struct ProcArgs {
    pub daemon_config: DaemonArgs,
    pub listen: Endpoint,
    pub staging_dir: PathBuf,
    pub final_dir: PathBuf,
    pub thread_number: usize,
    pub connections_per_acceptor: usize,
    pub timeout: Duration,
    pub max_file_size: u64,
    pub max_file_age: Duration,
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
            Arg::new(ARG_MAX_FILE_SIZE)
                .help("Rotate a file once it reaches this size, in bytes or humanized (\"32Mi\")")
                .value_name("SIZE")
                .long(ARG_MAX_FILE_SIZE)
                .num_args(1)
                .default_value("33554432"),
        )
        .arg(
            Arg::new(ARG_MAX_FILE_AGE)
                .help("Rotate a file once it reaches this age, in seconds or humanized (\"5m\")")
                .value_name("AGE")
                .long(ARG_MAX_FILE_AGE)
                .num_args(1)
                .default_value("300"),
        )
        .arg(
            Arg::new(ARG_LISTEN_ENDPOINT)
                .help("Endpoint to listen on")
                .value_name("LISTEN ENDPOINT")
                .num_args(1)
                .required_unless_present("version"),
        )
        .arg(
            Arg::new(ARG_STAGING_DIR)
                .help("Directory receiving files are written to")
                .value_name("STAGING DIR")
                .value_hint(ValueHint::DirPath)
                .value_parser(value_parser!(PathBuf))
                .num_args(1)
                .required_unless_present("version"),
        )
        .arg(
            Arg::new(ARG_FINAL_DIR)
                .help("Directory closed files are moved to")
                .value_name("FINAL DIR")
                .value_hint(ValueHint::DirPath)
                .value_parser(value_parser!(PathBuf))
                .num_args(1)
                .required_unless_present("version"),
        )
}

fn check_dir(path: &Path, what: &str) -> anyhow::Result<()> {
    let metadata =
        std::fs::metadata(path).context(format!("{what} {} is not usable", path.display()))?;
    if !metadata.is_dir() {
        return Err(anyhow!("{what} {} is not a directory", path.display()));
    }
    Ok(())
}

pub fn parse_clap() -> anyhow::Result<Option<ProcArgs>> {
    let args = build_cli_args().get_matches();

    let mut daemon_config = DaemonArgs::new();
    daemon_config.parse_clap(&args);
    if daemon_config.print_version {
        crate::build::print_version();
        return Ok(None);
    }

    let listen = args.get_one::<String>(ARG_LISTEN_ENDPOINT).unwrap();
    let listen = Endpoint::from_str(listen).context(format!("invalid listen endpoint {listen}"))?;

    let staging_dir = args.get_one::<PathBuf>(ARG_STAGING_DIR).unwrap().clone();
    let final_dir = args.get_one::<PathBuf>(ARG_FINAL_DIR).unwrap().clone();
    check_dir(&staging_dir, "staging dir")?;
    check_dir(&final_dir, "final dir")?;
    let staging_cmp = staging_dir.to_string_lossy().to_lowercase();
    let final_cmp = final_dir.to_string_lossy().to_lowercase();
    if staging_cmp == final_cmp {
        return Err(anyhow!(
            "staging dir and final dir must not be the same path"
        ));
    }

    let thread_number = *args.get_one::<u64>(ARG_THREAD_NUMBER).unwrap() as usize;
    let connections_per_acceptor = *args.get_one::<u64>(ARG_CONNECTIONS).unwrap() as usize;

    let timeout = t3_clap::humanize::get_duration(&args, ARG_TIMEOUT)?
        .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT));
    if !(Duration::from_secs(MIN_TIMEOUT)..=Duration::from_secs(MAX_TIMEOUT)).contains(&timeout) {
        return Err(anyhow!(
            "timeout {timeout:?} out of range {MIN_TIMEOUT}s..={MAX_TIMEOUT}s"
        ));
    }

    let max_file_size = t3_clap::humanize::get_usize(&args, ARG_MAX_FILE_SIZE)?
        .map(|v| v as u64)
        .unwrap_or(DEFAULT_FILE_SIZE);
    if !(MIN_FILE_SIZE..=MAX_FILE_SIZE).contains(&max_file_size) {
        return Err(anyhow!(
            "max file size {max_file_size} out of range {MIN_FILE_SIZE}..={MAX_FILE_SIZE}"
        ));
    }

    let max_file_age = t3_clap::humanize::get_duration(&args, ARG_MAX_FILE_AGE)?
        .unwrap_or(Duration::from_secs(DEFAULT_FILE_AGE));
    if !(Duration::from_secs(MIN_FILE_AGE)..=Duration::from_secs(MAX_FILE_AGE))
        .contains(&max_file_age)
    {
        return Err(anyhow!(
            "max file age {max_file_age:?} out of range {MIN_FILE_AGE}s..={MAX_FILE_AGE}s"
        ));
    }

    Ok(Some(ProcArgs {
        daemon_config,
        listen,
        staging_dir,
        final_dir,
        thread_number,
        connections_per_acceptor,
        timeout,
        max_file_size,
        max_file_age,
    }))
}
