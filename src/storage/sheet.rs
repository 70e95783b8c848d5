//! Append-only analytics sheet backed by a CSV table
//!
//! One fixed header row pinned to the current schema version, then one
//! row per submission. The handle is cheap and opened per request; no
//! state survives between requests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::analytics::models::{SubmissionRecord, COLUMNS};

use super::error::{StoreError, StoreResult};
use super::lock::{FileLockBackend, LockManager};

const SHEET_FILE: &str = "analytics.csv";
const LOCK_FILE: &str = "analytics.lock";

/// TTL stamped into the lock file; a holder gone longer than this is
/// considered crashed and its lock is reclaimed.
const LOCK_TTL: Duration = Duration::from_secs(30);

/// Per-request handle to the analytics sheet
pub struct SheetStore {
    sheet_path: PathBuf,
    locks: LockManager,
    lock_wait: Duration,
}

impl SheetStore {
    /// Open a handle onto the sheet in `data_dir`.
    ///
    /// Opening never touches the filesystem; a missing sheet surfaces on
    /// the first append or scan.
    pub fn open(data_dir: &Path, lock_wait: Duration) -> Self {
        let backend = FileLockBackend::new(data_dir.join(LOCK_FILE));
        Self {
            sheet_path: data_dir.join(SHEET_FILE),
            locks: LockManager::new(Arc::new(backend)),
            lock_wait,
        }
    }

    /// Path of the backing CSV file.
    pub fn sheet_path(&self) -> &Path {
        &self.sheet_path
    }

    /// Whether the backing sheet exists.
    pub fn is_initialized(&self) -> bool {
        self.sheet_path.exists()
    }

    /// Create or reset the sheet with its pinned header row.
    ///
    /// Idempotent; an existing sheet is cleared, matching the operator
    /// setup flow of the original deployment.
    pub async fn setup(&self) -> StoreResult<()> {
        if let Some(parent) = self.sheet_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut writer = csv::Writer::from_path(&self.sheet_path)?;
        writer.write_record(COLUMNS)?;
        writer.flush()?;

        info!("Analytics sheet initialized at {}", self.sheet_path.display());
        Ok(())
    }

    /// Append one submission under the write lock.
    ///
    /// Returns the new row's 1-based ordinal among data rows, equal to
    /// the sheet's record count after the append. Fails without touching
    /// the sheet when it is missing; ingestion never creates the schema
    /// implicitly, to avoid racing a concurrent setup.
    pub async fn append(&self, record: &SubmissionRecord) -> StoreResult<u64> {
        if !self.is_initialized() {
            return Err(StoreError::Uninitialized(self.sheet_path.clone()));
        }

        let holder = format!("append-{}", std::process::id());
        let guard = self
            .locks
            .wait_for_lock(&holder, LOCK_TTL, self.lock_wait)
            .await?;

        // The csv crate is synchronous; keep its file passes off the
        // executor threads.
        let path = self.sheet_path.clone();
        let record = record.clone();
        let result = tokio::task::spawn_blocking(move || append_row(&path, &record))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?;
        guard.release().await?;

        let ordinal = result?;
        debug!("Appended submission row {}", ordinal);
        Ok(ordinal)
    }

    /// Scan every data row, oldest first, re-coercing each cell.
    ///
    /// Takes no lock: a summary racing an append may miss the in-flight
    /// row, which is acceptable for this data.
    pub async fn scan(&self) -> StoreResult<Vec<SubmissionRecord>> {
        if !self.is_initialized() {
            return Err(StoreError::Uninitialized(self.sheet_path.clone()));
        }

        let path = self.sheet_path.clone();
        let records = tokio::task::spawn_blocking(move || read_rows(&path))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))??;

        debug!("Scanned {} submission rows", records.len());
        Ok(records)
    }
}

fn append_row(sheet_path: &Path, record: &SubmissionRecord) -> StoreResult<u64> {
    let existing = count_rows(sheet_path)?;

    let file = std::fs::OpenOptions::new().append(true).open(sheet_path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.write_record(record.to_row())?;
    writer.flush()?;

    Ok(existing + 1)
}

fn count_rows(sheet_path: &Path) -> StoreResult<u64> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(sheet_path)?;
    let mut count = 0u64;
    for row in reader.records() {
        row?;
        count += 1;
    }
    Ok(count)
}

fn read_rows(sheet_path: &Path) -> StoreResult<Vec<SubmissionRecord>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(sheet_path)?;
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(SubmissionRecord::from_row(&row));
    }
    Ok(records)
}
