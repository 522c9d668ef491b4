use tracing::{debug, info, warn};

use super::{
    affected_rows_message, DatabaseConnection, QueryOutcome, StatementKind, TabularResult,
    NO_DATA_MESSAGE,
};
use crate::config::DatabaseSettings;
use crate::error::{Result, SessionError};

pub const EMPTY_STATEMENT: &str = "Please enter a SQL statement";
pub const NO_TABLE_SELECTED: &str = "Please select a table";

/// Owns at most one lazily opened connection.
///
/// Every operation opens the connection first when it is absent. A failed
/// open leaves the session disconnected and is reported as
/// [`SessionError::Connect`]. Statement failures leave the connection open.
pub struct Session {
    settings: DatabaseSettings,
    connection: Option<DatabaseConnection>,
}

impl Session {
    pub fn new(settings: DatabaseSettings) -> Self {
        Self {
            settings,
            connection: None,
        }
    }

    pub fn settings(&self) -> &DatabaseSettings {
        &self.settings
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Opens the connection if absent. Failures are logged, not returned.
    pub async fn connect(&mut self) -> bool {
        match self.try_connect().await {
            Ok(()) => true,
            Err(err) => {
                warn!("{err}");
                false
            }
        }
    }

    /// Like [`Session::connect`] but keeps the failure reason.
    pub async fn try_connect(&mut self) -> Result<()> {
        self.connection().await.map(|_| ())
    }

    /// Closes and drops the connection. No-op when disconnected.
    pub async fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err(err) = connection.close().await {
                warn!("Error while closing database connection: {err}");
            }
            info!("Disconnected from {} database", self.settings.driver);
        }
    }

    /// User table names, ordered by name, without the driver's system tables.
    pub async fn list_tables(&mut self) -> Result<Vec<String>> {
        let connection = self.connection().await?;
        let prefix = connection.driver().system_prefix();

        let tables = connection
            .get_tables()
            .await
            .map_err(SessionError::catalog)?;

        Ok(tables
            .into_iter()
            .filter(|name| !name.to_ascii_lowercase().starts_with(prefix))
            .collect())
    }

    /// Runs `sql` verbatim.
    ///
    /// Read statements produce rows; anything else is executed with autocommit
    /// and reported as an affected-row count.
    pub async fn execute_query(&mut self, sql: &str) -> Result<QueryOutcome> {
        if sql.trim().is_empty() {
            return Err(SessionError::InvalidInput(EMPTY_STATEMENT.to_string()));
        }

        let connection = self.connection().await?;
        let kind = StatementKind::classify(sql);
        debug!(?kind, "Executing statement");

        match kind {
            StatementKind::Read => {
                let rows = connection.fetch_rows(sql).await.map_err(SessionError::execute)?;
                Ok(match rows {
                    Some(table) => QueryOutcome::Rows(table),
                    None => QueryOutcome::Message(NO_DATA_MESSAGE.to_string()),
                })
            }
            StatementKind::Write => {
                let affected = connection
                    .execute_statement(sql)
                    .await
                    .map_err(SessionError::execute)?;
                Ok(QueryOutcome::Message(affected_rows_message(affected)))
            }
        }
    }

    /// Column metadata of `table_name`. An unknown table gives an empty result.
    pub async fn get_table_info(&mut self, table_name: &str) -> Result<TabularResult> {
        let table_name = table_name.trim();
        if table_name.is_empty() {
            return Err(SessionError::InvalidInput(NO_TABLE_SELECTED.to_string()));
        }

        self.connection()
            .await?
            .describe_table(table_name)
            .await
            .map_err(SessionError::catalog)
    }

    async fn connection(&mut self) -> Result<&mut DatabaseConnection> {
        let connection = match self.connection.take() {
            Some(connection) => connection,
            None => self.open().await?,
        };
        Ok(self.connection.insert(connection))
    }

    async fn open(&self) -> Result<DatabaseConnection> {
        let settings = &self.settings;
        debug!(
            driver = %settings.driver,
            host = %settings.host,
            port = settings.port,
            database = %settings.database,
            "Opening database connection"
        );

        let connection = DatabaseConnection::connect(settings)
            .await
            .map_err(|err| SessionError::Connect(err.to_string()))?;

        info!("Connected to {} database", settings.driver);
        Ok(connection)
    }
}
