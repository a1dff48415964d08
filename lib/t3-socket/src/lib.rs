/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

pub mod tcp;

#[cfg(unix)]
pub mod unix;
