// src/track/mod.rs
pub mod backup;
mod export;
mod status;
mod store;

pub use export::ExportFormat;
pub use status::Status;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::error::{PersistenceError, TrackError};
use crate::fingerprint::Fingerprint;
use crate::item::Item;

use store::Store;

/// One status change in a record's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: Status,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A lead with its full review history.
///
/// Invariants: `history` is append-only with non-decreasing timestamps,
/// and `status` always equals the last history entry's status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedRecord {
    pub fingerprint: Fingerprint,
    /// Snapshot of the item as first seen. Later sightings do not mutate it.
    pub item: Item,
    pub status: Status,
    pub history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Durable status tracking, keyed by fingerprint.
///
/// One explicitly constructed instance per caller scope; `&mut self` on
/// every mutation makes this process a single writer, and the store's lock
/// file serializes writers across processes. Every mutation is written
/// durably before the in-memory state changes, so `status` and
/// `history.last` can never disagree, even across a crash.
pub struct Tracker {
    store: Store,
    records: Vec<TrackedRecord>,
    index: HashMap<String, usize>,
}

impl Tracker {
    /// Load (or start) the store at `path`. A missing file is an empty
    /// tracker; an unreadable or corrupt one is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        crate::metrics::describe_metrics();
        let store = Store::new(path);
        let records = store.load()?;
        let mut tracker = Self {
            store,
            records,
            index: HashMap::new(),
        };
        tracker.rebuild_index();
        Ok(tracker)
    }

    pub fn storage_path(&self) -> &Path {
        self.store.path()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Start tracking an item. Idempotent: a known fingerprint returns
    /// unchanged without touching the store.
    pub fn track(&mut self, item: &Item) -> Result<Fingerprint, TrackError> {
        let fp = Fingerprint::of(item);
        if self.index.contains_key(fp.as_str()) {
            return Ok(fp);
        }

        let now = Utc::now();
        let record = TrackedRecord {
            fingerprint: fp.clone(),
            item: item.clone(),
            status: Status::New,
            history: vec![StatusChange {
                status: Status::New,
                at: now,
                note: None,
            }],
            created_at: now,
            updated_at: now,
        };

        self.records.push(record);
        if let Err(e) = self.store.save(&self.records) {
            self.records.pop();
            return Err(e.into());
        }
        self.index.insert(fp.as_str().to_string(), self.records.len() - 1);
        counter!("track_records_total").increment(1);
        tracing::info!(fingerprint = %fp, source = %item.source, "tracking new lead");
        Ok(fp)
    }

    pub fn update_status(&mut self, fp: &Fingerprint, to: Status) -> Result<(), TrackError> {
        self.apply_transition(fp, to, None)
    }

    pub fn update_status_with_note(
        &mut self,
        fp: &Fingerprint,
        to: Status,
        note: impl Into<String>,
    ) -> Result<(), TrackError> {
        self.apply_transition(fp, to, Some(note.into()))
    }

    fn apply_transition(
        &mut self,
        fp: &Fingerprint,
        to: Status,
        note: Option<String>,
    ) -> Result<(), TrackError> {
        let idx = *self
            .index
            .get(fp.as_str())
            .ok_or_else(|| TrackError::NotFound(fp.to_string()))?;

        let from = self.records[idx].status;
        if !from.can_transition(to) {
            return Err(TrackError::InvalidTransition { from, to });
        }

        let now = Utc::now();
        let prev_updated = self.records[idx].updated_at;
        {
            let rec = &mut self.records[idx];
            rec.history.push(StatusChange {
                status: to,
                at: now,
                note,
            });
            rec.status = to;
            rec.updated_at = now;
        }
        if let Err(e) = self.store.save(&self.records) {
            // The write did not land; undo the staged change.
            let rec = &mut self.records[idx];
            rec.history.pop();
            rec.status = from;
            rec.updated_at = prev_updated;
            return Err(e.into());
        }
        counter!("track_transitions_total").increment(1);
        tracing::info!(fingerprint = %fp, %from, %to, "status updated");
        Ok(())
    }

    pub fn get(&self, fp: &Fingerprint) -> Option<&TrackedRecord> {
        self.index
            .get(fp.as_str())
            .map(|&idx| &self.records[idx])
    }

    /// Insertion-ordered view, optionally filtered by status.
    pub fn get_all(&self, status_filter: Option<Status>) -> Vec<&TrackedRecord> {
        self.records
            .iter()
            .filter(|r| status_filter.map(|s| r.status == s).unwrap_or(true))
            .collect()
    }

    /// Remove one record. Returns false for an unknown fingerprint.
    pub fn delete(&mut self, fp: &Fingerprint) -> Result<bool, TrackError> {
        let Some(&idx) = self.index.get(fp.as_str()) else {
            return Ok(false);
        };
        let mut staged = self.records.clone();
        staged.remove(idx);
        self.store.save(&staged)?;
        self.records = staged;
        self.rebuild_index();
        tracing::info!(fingerprint = %fp, "record deleted");
        Ok(true)
    }

    /// Drop every record.
    pub fn clear(&mut self) -> Result<(), TrackError> {
        self.store.save(&[])?;
        self.records.clear();
        self.index.clear();
        Ok(())
    }

    /// Record counts per status.
    pub fn stats(&self) -> BTreeMap<Status, usize> {
        let mut out = BTreeMap::new();
        for r in &self.records {
            *out.entry(r.status).or_insert(0) += 1;
        }
        out
    }

    /// Serialize the filtered view.
    pub fn export(
        &self,
        format: ExportFormat,
        status_filter: Option<Status>,
    ) -> Result<String, TrackError> {
        let view = self.get_all(status_filter);
        match format {
            ExportFormat::Csv => Ok(export::to_csv(&view)),
            ExportFormat::Json => {
                export::to_json(&view).map_err(|e| TrackError::Persistence(e.into()))
            }
        }
    }

    /// Export straight to a file, with the same temp-then-rename write the
    /// store uses.
    pub fn export_to_file(
        &self,
        path: &Path,
        format: ExportFormat,
        status_filter: Option<Status>,
    ) -> Result<(), TrackError> {
        let payload = self.export(format, status_filter)?;
        let io_err = |p: &Path, e: std::io::Error| {
            TrackError::Persistence(PersistenceError::Io {
                path: p.to_path_buf(),
                source: e,
            })
        };
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
            }
        }
        let mut tmp_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "export".to_string());
        tmp_name.push_str(".tmp");
        let tmp = path.with_file_name(tmp_name);
        let mut f = fs::File::create(&tmp).map_err(|e| io_err(&tmp, e))?;
        f.write_all(payload.as_bytes()).map_err(|e| io_err(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
        Ok(())
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.fingerprint.as_str().to_string(), i))
            .collect();
    }
}
