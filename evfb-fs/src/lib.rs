//! evfb-fs library - event feedback form submission service
//!
//! Respondents walk a published form step by step; answers are saved as they
//! go and can be resumed with the submission key. Organizers edit form
//! schemas through the same service.

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod engine;
pub mod error;
pub mod forms;
pub mod store;

use engine::SubmissionEngine;
use forms::FormEditor;
use store::{MemoryResponseStore, MemorySchemaStore, ResponseStore, SchemaStore, SqliteStore};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SubmissionEngine>,
    pub editor: Arc<FormEditor>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire the engine and editor over the given stores
    pub fn new(schema: Arc<dyn SchemaStore>, responses: Arc<dyn ResponseStore>) -> Self {
        Self {
            engine: Arc::new(SubmissionEngine::new(schema.clone(), responses)),
            editor: Arc::new(FormEditor::new(schema)),
            startup_time: Utc::now(),
        }
    }

    /// Both stores backed by one SQLite pool
    pub fn with_sqlite(pool: SqlitePool) -> Self {
        let store = Arc::new(SqliteStore::new(pool));
        Self::new(store.clone(), store)
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemorySchemaStore::new()),
            Arc::new(MemoryResponseStore::new()),
        )
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::submission_routes())
        .merge(api::form_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
