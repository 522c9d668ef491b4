mod handlers;
mod outcome;

pub use handlers::*;
pub use outcome::*;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::app::AppState;

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/tables", get(list_tables))
        .route("/api/tables/{table}", get(table_info))
        .route("/api/query", post(execute_query))
        .route("/api/connect", post(connect))
        .route("/api/disconnect", post(disconnect))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
