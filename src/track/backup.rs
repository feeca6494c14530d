// src/track/backup.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;

#[async_trait::async_trait]
pub trait BackupSink: Send + Sync {
    /// Store one named snapshot (best-effort durable).
    async fn store(&self, name: &str, contents: &str) -> Result<()>;
}

/// Writes snapshots as files under a directory.
pub struct DirSink {
    dir: PathBuf,
}

impl DirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait::async_trait]
impl BackupSink for DirSink {
    async fn store(&self, name: &str, contents: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Snapshot the store file into the sink once. A store that does not exist
/// yet is not an error; there is just nothing to back up.
pub async fn backup_store_once<S: BackupSink>(store_path: &Path, sink: &S) -> Result<()> {
    let contents = match std::fs::read_to_string(store_path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let name = format!("tracked-{stamp}.json");
    sink.store(&name, &contents).await
}

/// Periodic tokio task. Wire this from app startup when
/// `tracking.auto_backup` is enabled.
pub fn spawn_backup_task<S: BackupSink + 'static>(
    store_path: PathBuf,
    sink: S,
    interval_hours: u64,
) {
    let period = Duration::from_secs(interval_hours.max(1) * 3600);
    tokio::spawn(async move {
        loop {
            if let Err(e) = backup_store_once(&store_path, &sink).await {
                tracing::warn!(error = %e, "store backup failed");
            }
            tokio::time::sleep(period).await;
        }
    });
}

// --- Test helper ---
pub struct MockSink {
    pub calls: std::sync::Mutex<Vec<(String, String)>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            calls: std::sync::Mutex::new(vec![]),
        }
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BackupSink for MockSink {
    async fn store(&self, name: &str, contents: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), contents.to_string()));
        Ok(())
    }
}
