/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::sync::atomic::{AtomicU64, Ordering};

/// Accept counters of one listening endpoint.
#[derive(Default)]
pub struct ListenStats {
    accepted: AtomicU64,
    failed: AtomicU64,
    alive_tasks: AtomicU64,
}

impl ListenStats {
    pub fn new() -> Self {
        ListenStats::default()
    }

    pub fn add_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn add_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn inc_alive_task(&self) {
        self.alive_tasks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_alive_task(&self) {
        self.alive_tasks.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get_alive_count(&self) -> u64 {
        self.alive_tasks.load(Ordering::Relaxed)
    }
}
