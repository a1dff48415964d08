/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

mod endpoint;
pub use endpoint::{Endpoint, UnixAddr, UNIX_PATH_MAX};
