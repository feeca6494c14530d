// src/track/store.rs
// Durable backing store: one JSON document holding every tracked record in
// insertion order. Writes go to a temp file and land via atomic rename, so
// readers never observe a partial document. Cross-process writers are
// serialized by a sibling `.lock` file.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

use super::TrackedRecord;

const LOCK_POLL: Duration = Duration::from_millis(25);

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    records: Vec<TrackedRecord>,
}

#[derive(Debug)]
pub(crate) struct Store {
    path: PathBuf,
    /// How long `save` waits for a competing writer.
    lock_wait: Duration,
    /// A lock older than this is treated as left behind by a dead process.
    stale_after: Duration,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_wait: Duration::from_secs(5),
            stale_after: Duration::from_secs(30),
        }
    }

    #[cfg(test)]
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full record list. A missing file is an empty store; rename
    /// atomicity means no lock is needed here.
    pub fn load(&self) -> Result<Vec<TrackedRecord>, PersistenceError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PersistenceError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        let file: StoreFile = serde_json::from_str(&raw)?;
        Ok(file.records)
    }

    /// Replace the store contents durably. Holds the lock across the temp
    /// write and the rename.
    pub fn save(&self, records: &[TrackedRecord]) -> Result<(), PersistenceError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(|e| PersistenceError::Io {
                    path: dir.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let _lock = acquire_lock(&self.path, self.lock_wait, self.stale_after)?;

        let file = StoreFile {
            saved_at: Some(Utc::now()),
            records: records.to_vec(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let tmp = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp).map_err(|e| PersistenceError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        f.write_all(json.as_bytes()).map_err(|e| PersistenceError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| PersistenceError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(())
    }
}

/// Lock released on drop. Removal is best-effort; a leaked lock is evicted
/// by the next writer once it goes stale.
struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn lock_path_for(store_path: &Path) -> PathBuf {
    let mut name = store_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "store".to_string());
    name.push_str(".lock");
    store_path.with_file_name(name)
}

fn acquire_lock(
    store_path: &Path,
    wait: Duration,
    stale_after: Duration,
) -> Result<LockGuard, PersistenceError> {
    let lock_path = lock_path_for(store_path);
    let deadline = Instant::now() + wait;
    loop {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut f) => {
                let _ = write!(f, "{}", std::process::id());
                return Ok(LockGuard { path: lock_path });
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                // The deadline bounds eviction retries too; removal can
                // fail and leave the lock in place.
                if Instant::now() >= deadline {
                    return Err(PersistenceError::LockTimeout {
                        path: lock_path,
                        waited_ms: wait.as_millis() as u64,
                    });
                }
                if lock_is_stale(&lock_path, stale_after) {
                    tracing::warn!(lock = %lock_path.display(), "evicting stale store lock");
                    if fs::remove_file(&lock_path).is_ok() {
                        continue;
                    }
                }
                std::thread::sleep(LOCK_POLL);
            }
            Err(e) => {
                return Err(PersistenceError::Io {
                    path: lock_path,
                    source: e,
                })
            }
        }
    }
}

fn lock_is_stale(lock_path: &Path, stale_after: Duration) -> bool {
    fs::metadata(lock_path)
        .and_then(|m| m.modified())
        .map(|modified| {
            modified
                .elapsed()
                .map(|age| age > stale_after)
                .unwrap_or(false)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Fingerprint;
    use crate::item::Item;
    use crate::track::{Status, StatusChange};

    fn record(id: &str) -> TrackedRecord {
        let item = Item::new(id, "title", format!("https://example.com/{id}"), "");
        let now = Utc::now();
        TrackedRecord {
            fingerprint: Fingerprint::of(&item),
            item,
            status: Status::New,
            history: vec![StatusChange {
                status: Status::New,
                at: now,
                note: None,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn save_then_load_round_trips_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("leads.json"));
        let records = vec![record("a"), record("b"), record("c")];
        store.save(&records).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].item.id, "a");
        assert_eq!(loaded[2].item.id, "c");
    }

    #[test]
    fn missing_file_is_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("nope.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_a_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.json");
        fs::write(&path, "{ not json").unwrap();
        let store = Store::new(path);
        assert!(matches!(store.load(), Err(PersistenceError::Data(_))));
    }

    #[test]
    fn save_removes_its_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.json");
        let store = Store::new(path.clone());
        store.save(&[record("a")]).unwrap();
        assert!(!lock_path_for(&path).exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn held_lock_times_out_fresh_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.json");
        // Somebody else holds a fresh lock.
        fs::write(lock_path_for(&path), "123").unwrap();
        let store = Store::new(path).with_lock_wait(Duration::from_millis(100));
        let err = store.save(&[record("a")]).unwrap_err();
        assert!(matches!(err, PersistenceError::LockTimeout { .. }));
    }

    #[test]
    fn stale_lock_is_evicted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.json");
        fs::write(lock_path_for(&path), "123").unwrap();
        let mut store = Store::new(path.clone()).with_lock_wait(Duration::from_millis(200));
        store.stale_after = Duration::ZERO;
        store.save(&[record("a")]).unwrap();
        assert!(store.load().unwrap().len() == 1);
        assert!(!lock_path_for(&path).exists());
    }

    #[test]
    fn unremovable_stale_lock_still_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.json");
        // A directory at the lock path reads as held and can never be removed.
        fs::create_dir_all(lock_path_for(&path)).unwrap();
        let mut store = Store::new(path).with_lock_wait(Duration::from_millis(150));
        store.stale_after = Duration::ZERO;
        let err = store.save(&[record("a")]).unwrap_err();
        assert!(matches!(err, PersistenceError::LockTimeout { .. }));
    }
}
