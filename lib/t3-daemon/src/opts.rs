/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use clap::{Arg, ArgAction, ArgMatches, Command};

const ARG_VERSION: &str = "version";
const ARG_VERBOSE: &str = "verbose";

/// Options every daemon binary shares.
#[derive(Debug, Default)]
pub struct DaemonArgs {
    pub verbose_level: u8,
    pub print_version: bool,
}

impl DaemonArgs {
    pub fn new() -> Self {
        DaemonArgs::default()
    }

    pub fn parse_clap(&mut self, args: &ArgMatches) {
        self.verbose_level = args.get_count(ARG_VERBOSE);
        self.print_version = args.get_flag(ARG_VERSION);
    }
}

pub trait DaemonArgsExt {
    fn append_daemon_args(self) -> Self;
}

impl DaemonArgsExt for Command {
    fn append_daemon_args(self) -> Self {
        self.disable_version_flag(true)
            .arg(
                Arg::new(ARG_VERBOSE)
                    .help("Show verbose output")
                    .action(ArgAction::Count)
                    .short('v')
                    .long(ARG_VERBOSE),
            )
            .arg(
                Arg::new(ARG_VERSION)
                    .help("Show version")
                    .action(ArgAction::SetTrue)
                    .short('V')
                    .long(ARG_VERSION),
            )
    }
}
