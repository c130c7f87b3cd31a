//! Dump scheduler
//!
//! The mutual-exclusion write path for persisting snapshots.
//!
//! ## Responsibilities
//! - Serialize concurrent dump requests: at most one encode+write in flight
//! - Encode the map state current at the moment the dump actually starts
//! - Replace the destination file atomically (write-then-rename)
//!
//! ## State Machine
//! Idle → Dumping → Idle. A request arriving while a dump is in flight
//! blocks on the lock until the prior dump completes, then runs a fresh
//! encode+write of its own — requests are never dropped or coalesced.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{EmberError, Result};

/// Serialized, atomic persistence to a single destination path
pub struct DumpScheduler {
    /// Canonical destination file
    path: PathBuf,

    /// Guards the encode+write critical section, never in-memory mutation
    write_lock: Mutex<()>,
}

impl DumpScheduler {
    /// Create a scheduler for the given destination path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The destination path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist one snapshot, blocking until any in-flight dump finishes
    ///
    /// `snapshot` is invoked under the dump lock so the encoded frame
    /// reflects the map state current at the time this dump starts, not at
    /// the time it was requested.
    ///
    /// On failure the destination file is left as it was: the frame is
    /// staged to a temp file and only renamed over the canonical path once
    /// fully written and synced.
    pub fn request_dump<F>(&self, snapshot: F) -> Result<()>
    where
        F: FnOnce() -> Result<Vec<u8>>,
    {
        let _guard = self.write_lock.lock();

        let frame = snapshot()?;
        self.replace_file(&frame)?;

        tracing::debug!(
            path = %self.path.display(),
            bytes = frame.len(),
            "dumped snapshot"
        );

        Ok(())
    }

    /// Write-then-rename so a crash mid-write never leaves a half-written
    /// file at the canonical path
    fn replace_file(&self, frame: &[u8]) -> Result<()> {
        let tmp_path = self.path.with_extension("tmp");

        let result = (|| -> io::Result<()> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(frame)?;
            file.sync_all()?;
            fs::rename(&tmp_path, &self.path)
        })();

        result.map_err(|e| {
            // Best effort: don't leave the staging file behind
            let _ = fs::remove_file(&tmp_path);
            EmberError::Persistence(format!("cannot replace {}: {}", self.path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_dump_writes_destination_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.db");

        let scheduler = DumpScheduler::new(&path);
        scheduler.request_dump(|| Ok(b"payload".to_vec())).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"payload");
    }

    #[test]
    fn test_dump_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.db");

        let scheduler = DumpScheduler::new(&path);
        scheduler.request_dump(|| Ok(b"first".to_vec())).unwrap();
        scheduler.request_dump(|| Ok(b"second".to_vec())).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn test_failed_dump_surfaces_persistence_error() {
        // Parent directory does not exist, so staging must fail
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.db");

        let scheduler = DumpScheduler::new(&path);
        let result = scheduler.request_dump(|| Ok(b"payload".to_vec()));

        assert!(matches!(result, Err(EmberError::Persistence(_))));
    }

    #[test]
    fn test_snapshot_error_aborts_before_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.db");

        let scheduler = DumpScheduler::new(&path);
        let result = scheduler
            .request_dump(|| Err(EmberError::Payload("boom".to_string())));

        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_at_most_one_dump_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.db");

        let scheduler = Arc::new(DumpScheduler::new(&path));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..8 {
            let scheduler = Arc::clone(&scheduler);
            let in_flight = Arc::clone(&in_flight);
            let max_seen = Arc::clone(&max_seen);
            let completed = Arc::clone(&completed);

            handles.push(thread::spawn(move || {
                scheduler
                    .request_dump(|| {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(5));
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        completed.fetch_add(1, Ordering::SeqCst);
                        Ok(format!("dump-{}", i).into_bytes())
                    })
                    .unwrap();
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        // Every request ran its own encode+write; none overlapped
        assert_eq!(completed.load(Ordering::SeqCst), 8);
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(path.exists());
    }
}
