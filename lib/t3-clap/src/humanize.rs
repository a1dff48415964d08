/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;
use clap::ArgMatches;
use humanize_rs::bytes::Bytes;

/// Read a size argument, either humanized ("32M", "4Ki") or a plain
/// byte count.
pub fn get_usize(args: &ArgMatches, id: &str) -> anyhow::Result<Option<usize>> {
    if let Some(v) = args.get_one::<String>(id) {
        if let Ok(b) = v.parse::<Bytes>() {
            Ok(Some(b.size()))
        } else if let Ok(size) = usize::from_str(v) {
            Ok(Some(size))
        } else {
            Err(anyhow!("invalid {id} value {v}"))
        }
    } else {
        Ok(None)
    }
}

/// Read a duration argument, either humanized ("30s", "2m") or a plain
/// number of seconds.
pub fn get_duration(args: &ArgMatches, id: &str) -> anyhow::Result<Option<Duration>> {
    if let Some(v) = args.get_one::<String>(id) {
        if let Ok(timeout) = humanize_rs::duration::parse(v) {
            Ok(Some(timeout))
        } else if let Ok(timeout) = u64::from_str(v) {
            Ok(Some(Duration::from_secs(timeout)))
        } else if let Ok(timeout) = f64::from_str(v) {
            let timeout = Duration::try_from_secs_f64(timeout)
                .map_err(|e| anyhow!("out of range {id} value: {e}"))?;
            Ok(Some(timeout))
        } else {
            Err(anyhow!("invalid {id} value {v}"))
        }
    } else {
        Ok(None)
    }
}
