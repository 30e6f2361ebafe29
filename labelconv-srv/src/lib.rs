//! labelconv-srv library - conversion request lifecycle service
//!
//! Accepts customer conversion requests (metadata plus example files),
//! stages the files in object storage under a per-email folder, and keeps
//! the relational lifecycle status consistent with what the folder
//! actually contains.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod reconcile;
pub mod storage;
pub mod submission;

use storage::{ObjectStore, RetryPolicy};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Relational store for request records and the id counter
    pub db: SqlitePool,
    /// Object storage backend holding manifests, inputs and outputs
    pub store: Arc<dyn ObjectStore>,
    /// Bounded retry policy applied to storage writes
    pub retry: RetryPolicy,
    /// Maximum number of example files per submission
    pub max_upload_files: usize,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            db,
            store,
            retry: RetryPolicy::default(),
            max_upload_files: labelconv_common::config::DEFAULT_MAX_UPLOAD_FILES,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_upload_files(mut self, max: usize) -> Self {
        self.max_upload_files = max;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/requests", post(api::requests::submit_request))
        .route("/api/requests/:email", get(api::requests::get_request))
        .route("/api/download", get(api::download::download_file))
        .merge(api::health::health_routes())
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
