/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use bytes::Bytes;
use clap::{value_parser, Arg, ArgGroup, Command, ValueHint};

use t3_daemon::opts::{DaemonArgs, DaemonArgsExt};
use t3_types::net::Endpoint;

const ARG_ADDRESS: &str = "address";
const ARG_NUMBER_CONNECTIONS: &str = "number-connections";
const ARG_NUMBER_TRANSFERS: &str = "number-transfers-per-connection";
const ARG_NUMBER_LOOPS: &str = "number-loops";
const ARG_FILE: &str = "file";
const ARG_DATA: &str = "data";
const GROUP_PAYLOAD: &str = "payload";

/// Minimum number of connections.
pub const MIN_CONNECTIONS: u64 = 1;

/// Maximum number of connections.
pub const MAX_CONNECTIONS: u64 = 4096;

/// Default number of connections.
pub const DEFAULT_CONNECTIONS: u64 = 4;

/// Minimum number of transfers per connection.
pub const MIN_TRANSFERS: u64 = 1;

/// Maximum number of transfers per connection.
pub const MAX_TRANSFERS: u64 = 1_000_000;

/// Minimum number of loops.
pub const MIN_LOOPS: u64 = 1;

/// Maximum number of loops.
pub const MAX_LOOPS: u64 = 1_000_000;

/// Minimum payload size (bytes).
pub const MIN_DATA_TRANSFER: u64 = 1;

/// Maximum payload size (bytes).
pub const MAX_DATA_TRANSFER: u64 = 64 * 1024 * 1024;

#[derive(Debug)]
pub struct ProcArgs {
    pub daemon_config: DaemonArgs,
    pub address: Endpoint,
    pub number_connections: usize,
    pub number_transfers: usize,
    pub number_loops: usize,
    pub payload: Bytes,
}

fn build_cli_args() -> Command {
    Command::new(crate::build::PKG_NAME)
        .append_daemon_args()
        .arg(
            Arg::new(ARG_ADDRESS)
                .help("Endpoint to connect to")
                .value_name("ENDPOINT")
                .long(ARG_ADDRESS)
                .num_args(1)
                .required_unless_present("version"),
        )
        .arg(
            Arg::new(ARG_NUMBER_CONNECTIONS)
                .help("Number of simultaneous connections")
                .value_name("NUMBER")
                .long(ARG_NUMBER_CONNECTIONS)
                .num_args(1)
                .value_parser(value_parser!(u64).range(MIN_CONNECTIONS..=MAX_CONNECTIONS))
                .default_value("4"),
        )
        .arg(
            Arg::new(ARG_NUMBER_TRANSFERS)
                .help("Number of payload transfers per connection")
                .value_name("NUMBER")
                .long(ARG_NUMBER_TRANSFERS)
                .num_args(1)
                .value_parser(value_parser!(u64).range(MIN_TRANSFERS..=MAX_TRANSFERS))
                .default_value("1"),
        )
        .arg(
            Arg::new(ARG_NUMBER_LOOPS)
                .help("Number of connect/transfer/disconnect rounds per connection")
                .value_name("NUMBER")
                .long(ARG_NUMBER_LOOPS)
                .num_args(1)
                .value_parser(value_parser!(u64).range(MIN_LOOPS..=MAX_LOOPS))
                .default_value("1"),
        )
        .arg(
            Arg::new(ARG_FILE)
                .help("Send the contents of this file")
                .value_name("FILE")
                .long(ARG_FILE)
                .value_hint(ValueHint::FilePath)
                .value_parser(value_parser!(PathBuf))
                .num_args(1),
        )
        .arg(
            Arg::new(ARG_DATA)
                .help("Send this many generated bytes")
                .value_name("NUMBER BYTES")
                .long(ARG_DATA)
                .num_args(1)
                .value_parser(value_parser!(u64).range(MIN_DATA_TRANSFER..=MAX_DATA_TRANSFER)),
        )
        .group(
            ArgGroup::new(GROUP_PAYLOAD)
                .args([ARG_FILE, ARG_DATA])
                .multiple(false),
        )
}

fn load_file(path: &PathBuf) -> anyhow::Result<Bytes> {
    let metadata = std::fs::metadata(path)
        .context(format!("file {} is not usable", path.display()))?;
    if !metadata.is_file() {
        return Err(anyhow!("{} is not a regular file", path.display()));
    }
    if !(MIN_DATA_TRANSFER..=MAX_DATA_TRANSFER).contains(&metadata.len()) {
        return Err(anyhow!(
            "file size {} out of range {MIN_DATA_TRANSFER}..={MAX_DATA_TRANSFER}",
            metadata.len()
        ));
    }
    let data =
        std::fs::read(path).context(format!("failed to read file {}", path.display()))?;
    Ok(Bytes::from(data))
}

pub fn parse_clap() -> anyhow::Result<Option<ProcArgs>> {
    let args = build_cli_args().get_matches();

    let mut daemon_config = DaemonArgs::new();
    daemon_config.parse_clap(&args);
    if daemon_config.print_version {
        crate::build::print_version();
        return Ok(None);
    }

    let address = args.get_one::<String>(ARG_ADDRESS).unwrap();
    let address = Endpoint::from_str(address).context(format!("invalid address {address}"))?;

    let payload = if let Some(path) = args.get_one::<PathBuf>(ARG_FILE) {
        load_file(path)?
    } else if let Some(len) = args.get_one::<u64>(ARG_DATA) {
        Bytes::from(vec![b'0'; *len as usize])
    } else {
        return Err(anyhow!("either --{ARG_FILE} or --{ARG_DATA} has to be provided"));
    };

    let number_connections = *args.get_one::<u64>(ARG_NUMBER_CONNECTIONS).unwrap() as usize;
    let number_transfers = *args.get_one::<u64>(ARG_NUMBER_TRANSFERS).unwrap() as usize;
    let number_loops = *args.get_one::<u64>(ARG_NUMBER_LOOPS).unwrap() as usize;

    Ok(Some(ProcArgs {
        daemon_config,
        address,
        number_connections,
        number_transfers,
        number_loops,
        payload,
    }))
}
