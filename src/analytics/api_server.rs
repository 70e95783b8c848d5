//! REST API server for analytics collection and summary
//!
//! Every failure is scoped to its request and reported inside the JSON
//! payload; handlers always answer 200 and never propagate an error past
//! the HTTP boundary. Each request opens its own store handle, so no
//! state survives between requests.

use anyhow::Result;
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::storage::{SheetStore, StoreResult};

use super::engine::AnalyticsEngine;
use super::models::Summary;
use super::normalizer::SubmissionInput;

/// API server for the analytics endpoints
pub struct AnalyticsApiServer {
    config: Config,
}

impl AnalyticsApiServer {
    /// Create a new API server
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.config.port);
        let app = self.build_router();

        info!("Starting analytics API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Build the API router
    pub fn build_router(self) -> Router {
        let engine = AnalyticsEngine::new(self.config.recent_limit);
        let shared_state = Arc::new(ApiState {
            config: self.config,
            engine,
        });

        Router::new()
            .route("/ping", get(ping))
            .route("/submit", get(submit_query).post(submit_body))
            .route("/summary", get(summary))
            .layer(CorsLayer::permissive())
            .with_state(shared_state)
    }
}

/// Shared API state
struct ApiState {
    config: Config,
    engine: AnalyticsEngine,
}

impl ApiState {
    /// Per-request store handle.
    fn open_store(&self) -> SheetStore {
        SheetStore::open(&self.config.data_dir, self.config.lock_wait())
    }
}

/// Submission response payload
#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum SubmitResponse {
    Success { row: u64 },
    Error { message: String },
}

/// Summary response payload
#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum SummaryResponse {
    Success { summary: Summary },
    Error { message: String },
}

// API handlers

async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "message": format!("cuemaster-analytics {}", env!("CARGO_PKG_VERSION")),
    }))
}

async fn submit_query(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<SubmitResponse> {
    Json(process_submission(&state, SubmissionInput::from_query(params)).await)
}

async fn submit_body(State(state): State<Arc<ApiState>>, body: String) -> Json<SubmitResponse> {
    Json(process_submission(&state, SubmissionInput::from_json_str(&body)).await)
}

async fn process_submission(
    state: &ApiState,
    input: StoreResult<SubmissionInput>,
) -> SubmitResponse {
    let input = match input {
        Ok(input) => input,
        Err(e) => {
            warn!("Rejected submission: {}", e);
            return SubmitResponse::Error {
                message: e.to_string(),
            };
        }
    };

    let record = input.normalize(Utc::now());
    let store = state.open_store();

    match store.append(&record).await {
        Ok(row) => SubmitResponse::Success { row },
        Err(e) => {
            warn!("Failed to append submission: {}", e);
            SubmitResponse::Error {
                message: e.to_string(),
            }
        }
    }
}

async fn summary(State(state): State<Arc<ApiState>>) -> Json<SummaryResponse> {
    let store = state.open_store();

    match store.scan().await {
        Ok(records) => Json(SummaryResponse::Success {
            summary: state.engine.summarize(&records),
        }),
        Err(e) => {
            warn!("Failed to compute summary: {}", e);
            Json(SummaryResponse::Error {
                message: e.to_string(),
            })
        }
    }
}
