//! # CueMaster Analytics
//!
//! Collection service for gameplay and session analytics from the CueMaster
//! billiards training suite. Clients sync their local usage counters over
//! HTTP; each sync is normalized into one fixed-width row of an append-only
//! table, and a summary endpoint reduces the whole table on demand.
//!
//! ## Modules
//!
//! - `analytics` - Ingestion normalizer, summary engine, and the HTTP API
//! - `config` - Configuration from TOML files and environment variables
//! - `storage` - Append-only sheet store with a bounded-wait write lock
pub mod analytics;
pub mod config;
pub mod storage;
