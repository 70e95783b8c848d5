//! Bounded-wait write lock guarding sheet appends
//!
//! Appends from concurrent requests are serialized through an exclusive
//! lock file. Acquisition polls until a deadline and then fails with a
//! retryable timeout; this layer never retries a timed-out acquisition
//! itself, the caller owns the retry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::error::{StoreError, StoreResult};

/// Write lock information, serialized into the lock file so other
/// processes can judge staleness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteLock {
    /// Lock holder identifier
    pub holder: String,
    /// When the lock was acquired
    pub acquired_at: DateTime<Utc>,
    /// Time to live before the lock is considered abandoned
    pub ttl: Duration,
    /// Lock token for verification
    pub token: String,
}

impl WriteLock {
    /// Create a new write lock
    pub fn new(holder: String, ttl: Duration) -> Self {
        Self {
            holder,
            acquired_at: Utc::now(),
            ttl,
            token: Uuid::new_v4().to_string(),
        }
    }

    /// Check if the lock has outlived its TTL
    pub fn is_expired(&self) -> bool {
        let ttl = chrono::TimeDelta::from_std(self.ttl).unwrap_or(chrono::TimeDelta::MAX);
        Utc::now() > self.acquired_at + ttl
    }
}

/// Guard that releases the lock file when dropped
#[derive(Debug)]
pub struct FileLockGuard {
    lock: WriteLock,
    lock_file: PathBuf,
}

impl FileLockGuard {
    /// Get the lock information
    pub fn lock_info(&self) -> &WriteLock {
        &self.lock
    }

    /// Explicitly release the lock
    pub async fn release(self) -> StoreResult<()> {
        if self.owns_lock_file() {
            tokio::fs::remove_file(&self.lock_file)
                .await
                .map_err(|e| StoreError::lock(format!("Failed to release lock: {}", e)))?;
        }
        Ok(())
    }

    /// The on-disk lock is ours only while its token matches. After a
    /// reclaim the file belongs to the next holder, and a stale guard
    /// must not delete it out from under them.
    fn owns_lock_file(&self) -> bool {
        std::fs::read_to_string(&self.lock_file)
            .ok()
            .and_then(|content| serde_json::from_str::<WriteLock>(&content).ok())
            .is_some_and(|on_disk| on_disk.token == self.lock.token)
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        // Best-effort cleanup in drop, only while the lock is still ours
        if self.owns_lock_file() {
            let _ = std::fs::remove_file(&self.lock_file);
        }
    }
}

/// Backend trait for lock implementations
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Try to acquire the lock once, without waiting
    async fn try_acquire(&self, holder: &str, ttl: Duration) -> StoreResult<FileLockGuard>;

    /// Check if the lock is currently held
    async fn exists(&self) -> StoreResult<bool>;
}

/// File-based lock backend using exclusive file creation
pub struct FileLockBackend {
    lock_file: PathBuf,
}

impl FileLockBackend {
    /// Create a backend for the given lock file path
    pub fn new(lock_file: PathBuf) -> Self {
        Self { lock_file }
    }
}

#[async_trait]
impl LockBackend for FileLockBackend {
    async fn try_acquire(&self, holder: &str, ttl: Duration) -> StoreResult<FileLockGuard> {
        let attempt = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_file)
            .await;

        match attempt {
            Ok(mut file) => {
                let lock = WriteLock::new(holder.to_string(), ttl);
                let info = serde_json::to_string(&lock)
                    .map_err(|e| StoreError::lock(format!("Failed to encode lock info: {}", e)))?;
                file.write_all(info.as_bytes()).await?;
                file.flush().await?;
                Ok(FileLockGuard {
                    lock,
                    lock_file: self.lock_file.clone(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if let Ok(content) = tokio::fs::read_to_string(&self.lock_file).await {
                    if let Ok(existing) = serde_json::from_str::<WriteLock>(&content) {
                        if existing.is_expired() {
                            // Reclaim the abandoned lock; the next poll races
                            // fairly for the freed slot.
                            let _ = tokio::fs::remove_file(&self.lock_file).await;
                            return Err(StoreError::conflict(format!(
                                "reclaimed stale lock from {}",
                                existing.holder
                            )));
                        }
                        return Err(StoreError::conflict(format!(
                            "lock held by {}",
                            existing.holder
                        )));
                    }
                }
                Err(StoreError::conflict("lock file present but unreadable"))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self) -> StoreResult<bool> {
        Ok(self.lock_file.exists())
    }
}

/// Coordinates bounded-wait acquisition over a lock backend
pub struct LockManager {
    backend: Arc<dyn LockBackend>,
}

impl LockManager {
    /// Create a new lock manager
    pub fn new(backend: Arc<dyn LockBackend>) -> Self {
        Self { backend }
    }

    /// Wait for the lock to become available, up to `timeout`.
    ///
    /// Always makes at least one attempt, so a zero timeout degrades to a
    /// single try. A conflict that persists past the deadline surfaces as
    /// [`StoreError::Timeout`].
    pub async fn wait_for_lock(
        &self,
        holder: &str,
        ttl: Duration,
        timeout: Duration,
    ) -> StoreResult<FileLockGuard> {
        let deadline = tokio::time::Instant::now() + timeout;
        let retry_delay = Duration::from_millis(50);

        loop {
            match self.backend.try_acquire(holder, ttl).await {
                Ok(guard) => return Ok(guard),
                Err(e) if e.is_conflict() => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(StoreError::Timeout(timeout));
                    }
                    tokio::time::sleep(retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
