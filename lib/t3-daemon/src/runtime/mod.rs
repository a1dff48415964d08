/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use tokio::runtime::{Builder, Runtime};

/// Minimum number of worker threads.
pub const MIN_THREADS: usize = 1;

/// Maximum number of worker threads.
pub const MAX_THREADS: usize = 256;

/// Default number of worker threads.
pub const DEFAULT_THREADS: usize = 4;

/// Configuration of the worker runtime all I/O completions run on.
#[derive(Clone)]
pub struct RuntimeConfig {
    thread_number: usize,
    thread_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        RuntimeConfig {
            thread_number: DEFAULT_THREADS,
            thread_name: "worker".to_string(),
        }
    }

    pub fn set_thread_number(&mut self, num: usize) -> anyhow::Result<()> {
        if !(MIN_THREADS..=MAX_THREADS).contains(&num) {
            return Err(anyhow!(
                "thread number {num} out of range {MIN_THREADS}..={MAX_THREADS}"
            ));
        }
        self.thread_number = num;
        Ok(())
    }

    #[inline]
    pub fn thread_number(&self) -> usize {
        self.thread_number
    }

    pub fn set_thread_name(&mut self, name: impl Into<String>) {
        self.thread_name = name.into();
    }

    pub fn builder(&self) -> Builder {
        let mut builder = Builder::new_multi_thread();
        builder.worker_threads(self.thread_number).enable_all();
        let thread_name = self.thread_name.clone();
        builder.thread_name_fn(move || {
            static ATOMIC_ID: AtomicUsize = AtomicUsize::new(0);
            let id = ATOMIC_ID.fetch_add(1, Ordering::SeqCst);
            format!("{thread_name}#{id}")
        });
        builder
    }

    /// Build the runtime. Dropping the returned runtime blocks until no
    /// callback is executing, which is the process shutdown barrier.
    pub fn start(&self) -> anyhow::Result<Runtime> {
        self.builder()
            .build()
            .map_err(|e| anyhow!("runtime build failed: {e:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_number_bounds() {
        let mut config = RuntimeConfig::new();
        assert_eq!(config.thread_number(), DEFAULT_THREADS);
        assert!(config.set_thread_number(0).is_err());
        assert!(config.set_thread_number(257).is_err());
        assert!(config.set_thread_number(1).is_ok());
        assert!(config.set_thread_number(256).is_ok());
        assert_eq!(config.thread_number(), 256);
    }
}
