/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 t3 contributors
 */

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;

/// Rolling-file settings shared by every connection of a receiver.
#[derive(Debug)]
pub struct SpoolConfig {
    pub staging_dir: PathBuf,
    pub final_dir: PathBuf,
    pub max_file_size: u64,
    pub max_file_age: Duration,
}

/// Per-connection-slot file sequence counters.
///
/// A slot keeps counting across the sessions it serves, so a later
/// session never reuses a basename an earlier one already promoted.
#[derive(Default)]
pub struct FileSequences {
    inner: Mutex<HashMap<usize, u64>>,
}

impl FileSequences {
    pub fn new() -> Self {
        FileSequences::default()
    }

    /// The next 1-based sequence number for `connection_index`.
    pub fn next(&self, connection_index: usize) -> u64 {
        let mut map = self.inner.lock().unwrap();
        let seq = map.entry(connection_index).or_insert(0);
        *seq += 1;
        *seq
    }
}

struct StagingFile {
    file: File,
    name: String,
    size: u64,
    created: Instant,
}

/// The staging file of one connection, opened on the first write and
/// promoted into the final directory on rotation or teardown.
pub(crate) struct Spool {
    config: Arc<SpoolConfig>,
    sequences: Arc<FileSequences>,
    connection_index: usize,
    current: Option<StagingFile>,
}

impl Spool {
    pub(crate) fn new(
        config: Arc<SpoolConfig>,
        sequences: Arc<FileSequences>,
        connection_index: usize,
    ) -> Self {
        Spool {
            config,
            sequences,
            connection_index,
            current: None,
        }
    }

    fn file_name(&self, sequence: u64) -> String {
        format!("file-{}-{}.bin", self.connection_index, sequence)
    }

    async fn open_next(&mut self) -> io::Result<()> {
        // take the sequence number first, the name is composed from it
        let sequence = self.sequences.next(self.connection_index);
        let name = self.file_name(sequence);
        let path = self.config.staging_dir.join(&name);
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .await?;
        debug!("opened file {}", path.display());
        self.current = Some(StagingFile {
            file,
            name,
            size: 0,
            created: Instant::now(),
        });
        Ok(())
    }

    /// Append `data`, opening a staging file first if none is open, and
    /// rotate afterwards if the file outgrew or outlived its limits.
    pub(crate) async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if self.current.is_none() {
            self.open_next().await?;
        }
        let current = self.current.as_mut().unwrap();
        current.file.write_all(data).await?;
        current.size += data.len() as u64;

        if current.size >= self.config.max_file_size
            || current.created.elapsed() >= self.config.max_file_age
        {
            self.rotate().await?;
        }
        Ok(())
    }

    /// The instant the currently open file reaches its maximum age.
    pub(crate) fn age_deadline(&self) -> Option<Instant> {
        self.current
            .as_ref()
            .map(|c| c.created + self.config.max_file_age)
    }

    /// Close the current file and move it into the final directory,
    /// replacing any file of the same name there.
    pub(crate) async fn rotate(&mut self) -> io::Result<()> {
        let Some(mut current) = self.current.take() else {
            return Ok(());
        };
        current.file.flush().await?;
        drop(current.file);

        let old_path = self.config.staging_dir.join(&current.name);
        let new_path = self.config.final_dir.join(&current.name);
        info!(
            "moving file {} -> {} ({} bytes)",
            old_path.display(),
            new_path.display(),
            current.size
        );
        tokio::fs::rename(&old_path, &new_path).await
    }

    /// Teardown: promote a non-empty current file, delete an empty one.
    pub(crate) async fn finish(&mut self) {
        let non_empty = match &self.current {
            Some(c) => c.size > 0,
            None => return,
        };
        if non_empty {
            if let Err(e) = self.rotate().await {
                warn!(
                    "slot {}: failed to promote staging file: {e:?}",
                    self.connection_index
                );
            }
        } else {
            let current = self.current.take().unwrap();
            drop(current.file);
            let path = self.config.staging_dir.join(&current.name);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("failed to remove empty file {}: {e:?}", path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &tempfile::TempDir, max_size: u64, max_age: Duration) -> Arc<SpoolConfig> {
        let staging_dir = dir.path().join("staging");
        let final_dir = dir.path().join("final");
        std::fs::create_dir(&staging_dir).unwrap();
        std::fs::create_dir(&final_dir).unwrap();
        Arc::new(SpoolConfig {
            staging_dir,
            final_dir,
            max_file_size: max_size,
            max_file_age: max_age,
        })
    }

    #[tokio::test]
    async fn sequence_increments_before_name() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 1 << 30, Duration::from_secs(3600));
        let sequences = Arc::new(FileSequences::new());
        let mut spool = Spool::new(config.clone(), sequences.clone(), 7);

        spool.write(b"abc").await.unwrap();
        assert!(config.staging_dir.join("file-7-1.bin").exists());
        spool.rotate().await.unwrap();
        assert!(config.final_dir.join("file-7-1.bin").exists());
        assert!(!config.staging_dir.join("file-7-1.bin").exists());

        spool.write(b"def").await.unwrap();
        assert!(config.staging_dir.join("file-7-2.bin").exists());
        spool.finish().await;
        assert_eq!(
            std::fs::read(config.final_dir.join("file-7-2.bin")).unwrap(),
            b"def"
        );
    }

    #[tokio::test]
    async fn sequences_survive_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 1 << 30, Duration::from_secs(3600));
        let sequences = Arc::new(FileSequences::new());

        let mut first = Spool::new(config.clone(), sequences.clone(), 0);
        first.write(b"one").await.unwrap();
        first.finish().await;

        let mut second = Spool::new(config.clone(), sequences.clone(), 0);
        second.write(b"two").await.unwrap();
        second.finish().await;

        assert_eq!(
            std::fs::read(config.final_dir.join("file-0-1.bin")).unwrap(),
            b"one"
        );
        assert_eq!(
            std::fs::read(config.final_dir.join("file-0-2.bin")).unwrap(),
            b"two"
        );
    }

    #[tokio::test]
    async fn rotates_by_size() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 4096, Duration::from_secs(3600));
        let sequences = Arc::new(FileSequences::new());
        let mut spool = Spool::new(config.clone(), sequences, 1);

        spool.write(&[0u8; 5000]).await.unwrap();
        // reached the size limit, rotated inline
        assert!(config.final_dir.join("file-1-1.bin").exists());
        assert!(spool.age_deadline().is_none());

        spool.write(&[1u8; 10]).await.unwrap();
        spool.finish().await;
        assert_eq!(
            std::fs::read(config.final_dir.join("file-1-2.bin")).unwrap(),
            [1u8; 10]
        );
    }

    #[tokio::test]
    async fn promotion_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 1 << 30, Duration::from_secs(3600));
        std::fs::write(config.final_dir.join("file-2-1.bin"), b"stale").unwrap();

        let sequences = Arc::new(FileSequences::new());
        let mut spool = Spool::new(config.clone(), sequences, 2);
        spool.write(b"fresh").await.unwrap();
        spool.finish().await;
        assert_eq!(
            std::fs::read(config.final_dir.join("file-2-1.bin")).unwrap(),
            b"fresh"
        );
    }
}
