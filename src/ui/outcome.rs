use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

use crate::db::{QueryOutcome, TabularResult};
use crate::error::{ErrorReason, SessionError};

/// What the browser renders: a grid, a status message or an error message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Table(TabularResult),
    Message { message: String },
    Error { reason: ErrorReason, message: String },
}

impl Outcome {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Table(_) | Self::Message { .. } => StatusCode::OK,
            Self::Error { reason, .. } => match reason {
                ErrorReason::InvalidInput | ErrorReason::Execute => StatusCode::BAD_REQUEST,
                ErrorReason::Catalog => StatusCode::INTERNAL_SERVER_ERROR,
                ErrorReason::Connect => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

impl From<TabularResult> for Outcome {
    fn from(table: TabularResult) -> Self {
        Self::Table(table)
    }
}

impl From<QueryOutcome> for Outcome {
    fn from(outcome: QueryOutcome) -> Self {
        match outcome {
            QueryOutcome::Rows(table) => Self::Table(table),
            QueryOutcome::Message(message) => Self::Message { message },
        }
    }
}

impl From<SessionError> for Outcome {
    fn from(err: SessionError) -> Self {
        Self::Error {
            reason: err.reason(),
            message: err.to_string(),
        }
    }
}

impl<T> From<Result<T, SessionError>> for Outcome
where
    T: Into<Outcome>,
{
    fn from(result: Result<T, SessionError>) -> Self {
        match result {
            Ok(value) => value.into(),
            Err(err) => err.into(),
        }
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        if let Self::Error { reason, message } = &self {
            warn!(?reason, "{message}");
        }
        (self.status(), Json(self)).into_response()
    }
}
