//! Append-only sheet storage for analytics submissions
//!
//! The sheet is a CSV table with one pinned header row. Appends are
//! serialized by a bounded-wait file lock; reads take no lock and may
//! miss an in-flight append.

pub mod error;
pub mod lock;
pub mod sheet;

pub use error::{StoreError, StoreResult};
pub use lock::{FileLockBackend, LockBackend, LockManager, WriteLock};
pub use sheet::SheetStore;
