/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

mod stats;
pub use stats::ListenStats;

mod pool;
pub use pool::{AcceptorPool, Acceptors, StreamAcceptServer, DEFAULT_OFFLINE_GRACE};
