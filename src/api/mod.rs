//! REST facade over the executor and the result store.
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/api/health` | liveness and cached entry count |
//! | GET | `/api/device-types` | supported device types |
//! | POST | `/api/basic-commands` | catalog commands for a type |
//! | POST | `/api/execute` | run commands on one device |
//! | POST | `/api/batch-execute` | run commands on several devices |
//! | GET | `/api/results/{id}` | stored entry |
//! | GET | `/api/results/{id}/download` | stored entry as a JSON attachment |
//!
//! Every error body is `{"success": false, "error": "<message>"}`.

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::cache::ResultStore;
use crate::executor::Executor;

pub use error::ApiError;
pub use types::*;

mod error;
mod handlers;
pub mod types;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub executor: Executor,
    pub results: ResultStore,
}

impl AppState {
    pub fn new(executor: Executor) -> Self {
        Self {
            executor,
            results: ResultStore::new(),
        }
    }
}

/// Builds the application router. CORS is open to every origin.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/device-types", get(handlers::device_types))
        .route("/api/basic-commands", post(handlers::basic_commands))
        .route("/api/execute", post(handlers::execute))
        .route("/api/batch-execute", post(handlers::batch_execute))
        .route("/api/results/{id}", get(handlers::get_result))
        .route("/api/results/{id}/download", get(handlers::download_result))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API on an already bound listener until the process stops.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("API listening on http://{}", addr);
    }
    axum::serve(listener, router(state)).await
}
