mod connection;
mod session;
mod statement;

pub use connection::*;
pub use session::*;
pub use statement::*;

use serde::Serialize;
use serde_json::Value;

/// Column names plus rows of driver values, shared by query results, table
/// listings and table descriptions.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
}

impl TabularResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }

    /// Single-column table, one row per name.
    pub fn from_names(column: &str, names: Vec<String>) -> Self {
        let rows = names.into_iter().map(|name| vec![Value::String(name)]).collect();
        Self::new(vec![column.to_string()], rows)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum QueryOutcome {
    Rows(TabularResult),
    Message(String),
}

pub const NO_DATA_MESSAGE: &str = "Query executed successfully, no data returned";

pub fn affected_rows_message(rows: u64) -> String {
    format!("Executed successfully, rows affected: {rows}")
}
