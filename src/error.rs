use serde::Serialize;
use thiserror::Error;

/// Failure of a single session operation.
///
/// Every variant carries the human readable reason, usually the driver's own
/// message. None of them is fatal: the session stays usable afterwards.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to connect to database: {0}")]
    Connect(String),

    #[error("Failed to read catalog: {0}")]
    Catalog(String),

    #[error("Failed to execute query: {0}")]
    Execute(String),

    #[error("{0}")]
    InvalidInput(String),
}

/// Machine readable tag for a [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorReason {
    Connect,
    Catalog,
    Execute,
    InvalidInput,
}

impl SessionError {
    pub fn reason(&self) -> ErrorReason {
        match self {
            Self::Connect(_) => ErrorReason::Connect,
            Self::Catalog(_) => ErrorReason::Catalog,
            Self::Execute(_) => ErrorReason::Execute,
            Self::InvalidInput(_) => ErrorReason::InvalidInput,
        }
    }

    pub(crate) fn catalog(err: sqlx::Error) -> Self {
        Self::Catalog(err.to_string())
    }

    pub(crate) fn execute(err: sqlx::Error) -> Self {
        Self::Execute(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
