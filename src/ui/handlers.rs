use axum::{
    extract::{Path, State},
    response::Html,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::Outcome;
use crate::app::AppState;
use crate::db::{TabularResult, EMPTY_STATEMENT, NO_TABLE_SELECTED};
use crate::error::SessionError;

const INDEX_HTML: &str = include_str!("index.html");

pub const TABLE_NAME_COLUMN: &str = "TABLE_NAME";

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub sql: String,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn list_tables(State(state): State<AppState>) -> Outcome {
    let mut session = state.session.lock().await;
    session
        .list_tables()
        .await
        .map(|names| TabularResult::from_names(TABLE_NAME_COLUMN, names))
        .into()
}

pub async fn execute_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Outcome {
    // rejected before the session is touched
    if request.sql.trim().is_empty() {
        return SessionError::InvalidInput(EMPTY_STATEMENT.to_string()).into();
    }

    let mut session = state.session.lock().await;
    session.execute_query(&request.sql).await.into()
}

pub async fn table_info(State(state): State<AppState>, Path(table): Path<String>) -> Outcome {
    if table.trim().is_empty() {
        return SessionError::InvalidInput(NO_TABLE_SELECTED.to_string()).into();
    }

    let mut session = state.session.lock().await;
    session.get_table_info(&table).await.into()
}

pub async fn connect(State(state): State<AppState>) -> Outcome {
    let mut session = state.session.lock().await;
    match session.try_connect().await {
        Ok(()) => Outcome::message(format!("Connected to {} database", session.settings().driver)),
        Err(err) => err.into(),
    }
}

pub async fn disconnect(State(state): State<AppState>) -> Outcome {
    let mut session = state.session.lock().await;
    session.disconnect().await;
    Outcome::message("Disconnected")
}
