/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

pub mod listen;
pub mod opts;
pub mod runtime;

#[cfg(unix)]
pub mod signal;
