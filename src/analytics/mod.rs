//! Analytics ingestion and summary module
//!
//! Normalizes untrusted client sync payloads into fixed-width submission
//! rows and reduces the stored rows into aggregate summaries on demand.

pub mod api_server;
pub mod coerce;
pub mod engine;
pub mod models;
pub mod normalizer;

pub use api_server::AnalyticsApiServer;
pub use engine::AnalyticsEngine;
pub use models::{RecentSubmission, SubmissionRecord, Summary};
pub use normalizer::SubmissionInput;
