use std::str::FromStr;

use secrecy::ExposeSecret;
use serde_json::{Number, Value};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::postgres::types::{Oid, PgInterval, PgMoney, PgTimeTz};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::types::chrono::{FixedOffset, NaiveTime};
use sqlx::{Column, Connection, Executor, Row, Statement, TypeInfo, ValueRef};

use super::TabularResult;
use crate::config::{DatabaseSettings, Driver};

/// Column layout of [`DatabaseConnection::describe_table`], identical for all drivers.
pub const TABLE_INFO_COLUMNS: [&str; 5] = [
    "COLUMN_NAME",
    "DATA_TYPE",
    "DATA_LENGTH",
    "NULLABLE",
    "DATA_DEFAULT",
];

const PG_TABLES: &str = "SELECT table_name::text FROM information_schema.tables
     WHERE table_schema = current_schema() AND table_type = 'BASE TABLE'
     ORDER BY table_name";

const MYSQL_TABLES: &str = "SELECT CAST(table_name AS CHAR) FROM information_schema.tables
     WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'
     ORDER BY table_name";

const SQLITE_TABLES: &str = "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name";

const PG_TABLE_INFO: &str = r#"SELECT column_name::text AS "COLUMN_NAME",
            data_type::text AS "DATA_TYPE",
            character_maximum_length::bigint AS "DATA_LENGTH",
            is_nullable::text AS "NULLABLE",
            column_default::text AS "DATA_DEFAULT"
     FROM information_schema.columns
     WHERE table_schema = current_schema() AND table_name::text = $1
     ORDER BY ordinal_position"#;

const MYSQL_TABLE_INFO: &str = "SELECT CAST(column_name AS CHAR) AS COLUMN_NAME,
            CAST(data_type AS CHAR) AS DATA_TYPE,
            character_maximum_length AS DATA_LENGTH,
            CAST(is_nullable AS CHAR) AS NULLABLE,
            CAST(column_default AS CHAR) AS DATA_DEFAULT
     FROM information_schema.columns
     WHERE table_schema = DATABASE() AND table_name = ?
     ORDER BY ordinal_position";

const SQLITE_TABLE_INFO: &str = r#"SELECT name AS COLUMN_NAME,
            type AS DATA_TYPE,
            NULL AS DATA_LENGTH,
            CASE WHEN "notnull" = 0 THEN 'YES' ELSE 'NO' END AS NULLABLE,
            dflt_value AS DATA_DEFAULT
     FROM pragma_table_info(?)
     ORDER BY cid"#;

impl Driver {
    /// Table name prefix reserved for the engine's own tables.
    pub fn system_prefix(self) -> &'static str {
        match self {
            Self::Postgres => "pg_",
            Self::Mysql => "sys",
            Self::Sqlite => "sqlite_",
        }
    }
}

/// A single live connection. Not pooled.
pub enum DatabaseConnection {
    Postgres(PgConnection),
    MySql(MySqlConnection),
    Sqlite(SqliteConnection),
}

impl DatabaseConnection {
    pub async fn connect(settings: &DatabaseSettings) -> sqlx::Result<Self> {
        match settings.driver {
            Driver::Postgres => {
                let mut options = PgConnectOptions::new()
                    .host(&settings.host)
                    .port(settings.port)
                    .username(&settings.username)
                    .password(settings.password.expose_secret());
                if !settings.database.is_empty() {
                    options = options.database(&settings.database);
                }
                Ok(Self::Postgres(PgConnection::connect_with(&options).await?))
            }
            Driver::Mysql => {
                let mut options = MySqlConnectOptions::new()
                    .host(&settings.host)
                    .port(settings.port)
                    .username(&settings.username)
                    .password(settings.password.expose_secret());
                if !settings.database.is_empty() {
                    options = options.database(&settings.database);
                }
                Ok(Self::MySql(MySqlConnection::connect_with(&options).await?))
            }
            Driver::Sqlite => {
                let options = if settings.database.is_empty() || settings.database == ":memory:" {
                    SqliteConnectOptions::from_str("sqlite::memory:")?
                } else {
                    SqliteConnectOptions::new()
                        .filename(&settings.database)
                        .create_if_missing(true)
                };
                Ok(Self::Sqlite(SqliteConnection::connect_with(&options).await?))
            }
        }
    }

    pub fn driver(&self) -> Driver {
        match self {
            Self::Postgres(_) => Driver::Postgres,
            Self::MySql(_) => Driver::Mysql,
            Self::Sqlite(_) => Driver::Sqlite,
        }
    }

    pub async fn close(self) -> sqlx::Result<()> {
        match self {
            Self::Postgres(conn) => conn.close().await,
            Self::MySql(conn) => conn.close().await,
            Self::Sqlite(conn) => conn.close().await,
        }
    }

    /// Names of all base tables in the current schema, ordered by name.
    pub async fn get_tables(&mut self) -> sqlx::Result<Vec<String>> {
        match self {
            Self::Postgres(conn) => {
                sqlx::query_scalar::<_, String>(PG_TABLES)
                    .fetch_all(&mut *conn)
                    .await
            }
            Self::MySql(conn) => {
                sqlx::query_scalar::<_, String>(MYSQL_TABLES)
                    .fetch_all(&mut *conn)
                    .await
            }
            Self::Sqlite(conn) => {
                sqlx::query_scalar::<_, String>(SQLITE_TABLES)
                    .fetch_all(&mut *conn)
                    .await
            }
        }
    }

    /// Column metadata for `table`, ordered by column position. An unknown
    /// table yields no rows.
    pub async fn describe_table(&mut self, table: &str) -> sqlx::Result<TabularResult> {
        let rows: Vec<Vec<Value>> = match self {
            Self::Postgres(conn) => {
                let rows = sqlx::query(PG_TABLE_INFO)
                    .bind(table)
                    .fetch_all(&mut *conn)
                    .await?;
                rows.iter().map(pg_row_values).collect()
            }
            Self::MySql(conn) => {
                let rows = sqlx::query(MYSQL_TABLE_INFO)
                    .bind(table)
                    .fetch_all(&mut *conn)
                    .await?;
                rows.iter().map(mysql_row_values).collect()
            }
            Self::Sqlite(conn) => {
                let rows = sqlx::query(SQLITE_TABLE_INFO)
                    .bind(table)
                    .fetch_all(&mut *conn)
                    .await?;
                rows.iter().map(sqlite_row_values).collect()
            }
        };

        let columns = TABLE_INFO_COLUMNS.iter().map(|c| c.to_string()).collect();
        Ok(TabularResult::new(columns, rows))
    }

    /// Runs a row-returning statement.
    ///
    /// Returns `None` when the prepared statement describes no result columns;
    /// the statement is still executed in that case. The statement cache is
    /// cleared afterwards so a later schema change never meets stale column
    /// metadata.
    pub async fn fetch_rows(&mut self, sql: &str) -> sqlx::Result<Option<TabularResult>> {
        let result = self.prepare_and_fetch(sql).await;
        let cleared = self.clear_statement_cache().await;
        let table = result?;
        cleared?;
        Ok(table)
    }

    async fn prepare_and_fetch(&mut self, sql: &str) -> sqlx::Result<Option<TabularResult>> {
        match self {
            Self::Postgres(conn) => {
                let statement = conn.prepare(sql).await?;
                let columns = column_names(statement.columns());
                if columns.is_empty() {
                    conn.execute(sqlx::raw_sql(sql)).await?;
                    return Ok(None);
                }
                let rows = statement.query().fetch_all(&mut *conn).await?;
                let data = rows.iter().map(pg_row_values).collect();
                Ok(Some(TabularResult::new(columns, data)))
            }
            Self::MySql(conn) => {
                let statement = conn.prepare(sql).await?;
                let columns = column_names(statement.columns());
                if columns.is_empty() {
                    conn.execute(sqlx::raw_sql(sql)).await?;
                    return Ok(None);
                }
                let rows = statement.query().fetch_all(&mut *conn).await?;
                let data = rows.iter().map(mysql_row_values).collect();
                Ok(Some(TabularResult::new(columns, data)))
            }
            Self::Sqlite(conn) => {
                let statement = conn.prepare(sql).await?;
                let columns = column_names(statement.columns());
                if columns.is_empty() {
                    conn.execute(sqlx::raw_sql(sql)).await?;
                    return Ok(None);
                }
                let rows = statement.query().fetch_all(&mut *conn).await?;
                // "SELECT 1; SELECT 2, 3" yields rows of both result sets; keep the first
                let data = rows
                    .iter()
                    .take_while(|row| column_names(row.columns()) == columns)
                    .map(sqlite_row_values)
                    .collect();
                Ok(Some(TabularResult::new(columns, data)))
            }
        }
    }

    /// Runs a statement that returns no rows and reports the affected row
    /// count. The connection is in autocommit mode, so the change is committed
    /// when this returns.
    pub async fn execute_statement(&mut self, sql: &str) -> sqlx::Result<u64> {
        let result = match self {
            Self::Postgres(conn) => conn.execute(sqlx::raw_sql(sql)).await.map(|r| r.rows_affected()),
            Self::MySql(conn) => conn.execute(sqlx::raw_sql(sql)).await.map(|r| r.rows_affected()),
            Self::Sqlite(conn) => conn.execute(sqlx::raw_sql(sql)).await.map(|r| r.rows_affected()),
        };
        let cleared = self.clear_statement_cache().await;
        let affected = result?;
        cleared?;
        Ok(affected)
    }

    async fn clear_statement_cache(&mut self) -> sqlx::Result<()> {
        match self {
            Self::Postgres(conn) => conn.clear_cached_statements().await,
            Self::MySql(conn) => conn.clear_cached_statements().await,
            Self::Sqlite(conn) => conn.clear_cached_statements().await,
        }
    }
}

fn column_names<C: Column>(columns: &[C]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

fn float_value(v: f64) -> Value {
    Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(v.to_string()))
}

// Goes through the shortest decimal form so 0.1f32 stays 0.1.
fn float32_value(v: f32) -> Value {
    v.to_string()
        .parse::<f64>()
        .map(float_value)
        .unwrap_or_else(|_| Value::String(v.to_string()))
}

fn array_value<T>(items: Vec<Option<T>>, convert: impl Fn(T) -> Value) -> Value {
    Value::Array(
        items
            .into_iter()
            .map(|item| item.map(&convert).unwrap_or(Value::Null))
            .collect(),
    )
}

/// Stand-in for a non-NULL cell whose type has no decoder here.
fn undecoded_value(type_name: &str) -> Value {
    Value::String(format!("<{type_name}>"))
}

/// Renders an interval the way PostgreSQL prints it by default,
/// e.g. `1 year 2 mons 3 days 04:05:06`.
fn interval_text(interval: &PgInterval) -> String {
    fn unit(n: i32, name: &str) -> String {
        if n.abs() == 1 {
            format!("{n} {name}")
        } else {
            format!("{n} {name}s")
        }
    }

    let mut parts = Vec::new();
    let (years, months) = (interval.months / 12, interval.months % 12);
    if years != 0 {
        parts.push(unit(years, "year"));
    }
    if months != 0 {
        parts.push(unit(months, "mon"));
    }
    if interval.days != 0 {
        parts.push(unit(interval.days, "day"));
    }
    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let total = interval.microseconds.unsigned_abs();
        let (secs, micros) = (total / 1_000_000, total % 1_000_000);
        let mut time = format!(
            "{sign}{:02}:{:02}:{:02}",
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        if micros != 0 {
            let fraction = format!("{micros:06}");
            time.push('.');
            time.push_str(fraction.trim_end_matches('0'));
        }
        parts.push(time);
    }
    parts.join(" ")
}

fn pg_row_values(row: &PgRow) -> Vec<Value> {
    (0..row.len()).map(|idx| extract_pg_value(row, idx)).collect()
}

fn mysql_row_values(row: &MySqlRow) -> Vec<Value> {
    (0..row.len()).map(|idx| extract_mysql_value(row, idx)).collect()
}

fn sqlite_row_values(row: &SqliteRow) -> Vec<Value> {
    (0..row.len()).map(|idx| extract_sqlite_value(row, idx)).collect()
}

fn extract_pg_value(row: &PgRow, idx: usize) -> Value {
    let Ok(vr) = row.try_get_raw(idx) else {
        return Value::Null;
    };
    if vr.is_null() {
        return Value::Null;
    }

    let type_info = vr.type_info().into_owned();

    match type_info.name() {
        "BOOL" => {
            if let Ok(v) = row.try_get::<bool, _>(idx) {
                return Value::Bool(v);
            }
        }
        "INT2" => {
            if let Ok(v) = row.try_get::<i16, _>(idx) {
                return Value::from(v);
            }
        }
        "INT4" => {
            if let Ok(v) = row.try_get::<i32, _>(idx) {
                return Value::from(v);
            }
        }
        "INT8" => {
            if let Ok(v) = row.try_get::<i64, _>(idx) {
                return Value::from(v);
            }
        }
        "FLOAT4" => {
            if let Ok(v) = row.try_get::<f32, _>(idx) {
                return float32_value(v);
            }
        }
        "FLOAT8" => {
            if let Ok(v) = row.try_get::<f64, _>(idx) {
                return float_value(v);
            }
        }
        "NUMERIC" => {
            if let Ok(v) = row.try_get::<sqlx::types::BigDecimal, _>(idx) {
                return Value::String(v.to_string());
            }
        }
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" | "INET" | "CIDR" => {
            if let Ok(v) = row.try_get::<String, _>(idx) {
                return Value::String(v);
            }
        }
        "UUID" => {
            if let Ok(v) = row.try_get::<sqlx::types::Uuid, _>(idx) {
                return Value::String(v.to_string());
            }
        }
        "DATE" => {
            if let Ok(v) = row.try_get::<sqlx::types::chrono::NaiveDate, _>(idx) {
                return Value::String(v.to_string());
            }
        }
        "TIME" => {
            if let Ok(v) = row.try_get::<sqlx::types::chrono::NaiveTime, _>(idx) {
                return Value::String(v.to_string());
            }
        }
        "TIMESTAMP" => {
            if let Ok(v) = row.try_get::<sqlx::types::chrono::NaiveDateTime, _>(idx) {
                return Value::String(v.to_string());
            }
        }
        "TIMESTAMPTZ" => {
            if let Ok(v) = row.try_get::<sqlx::types::chrono::DateTime<sqlx::types::chrono::Utc>, _>(idx) {
                return Value::String(v.to_rfc3339());
            }
        }
        "JSON" | "JSONB" => {
            if let Ok(v) = row.try_get::<sqlx::types::JsonValue, _>(idx) {
                return v;
            }
        }
        "TIMETZ" => {
            if let Ok(v) = row.try_get::<PgTimeTz<NaiveTime, FixedOffset>, _>(idx) {
                return Value::String(format!("{}{}", v.time, v.offset));
            }
        }
        "INTERVAL" => {
            if let Ok(v) = row.try_get::<PgInterval, _>(idx) {
                return Value::String(interval_text(&v));
            }
        }
        "MONEY" => {
            if let Ok(v) = row.try_get::<PgMoney, _>(idx) {
                return Value::String(v.to_bigdecimal(2).to_string());
            }
        }
        "OID" => {
            if let Ok(v) = row.try_get::<Oid, _>(idx) {
                return Value::from(v.0);
            }
        }
        "BYTEA" => {
            if let Ok(v) = row.try_get::<Vec<u8>, _>(idx) {
                return Value::String(format!("\\x{}", hex::encode(v)));
            }
        }
        "BOOL[]" => {
            if let Ok(v) = row.try_get::<Vec<Option<bool>>, _>(idx) {
                return array_value(v, Value::Bool);
            }
        }
        "INT2[]" => {
            if let Ok(v) = row.try_get::<Vec<Option<i16>>, _>(idx) {
                return array_value(v, Value::from);
            }
        }
        "INT4[]" => {
            if let Ok(v) = row.try_get::<Vec<Option<i32>>, _>(idx) {
                return array_value(v, Value::from);
            }
        }
        "INT8[]" => {
            if let Ok(v) = row.try_get::<Vec<Option<i64>>, _>(idx) {
                return array_value(v, Value::from);
            }
        }
        "FLOAT4[]" => {
            if let Ok(v) = row.try_get::<Vec<Option<f32>>, _>(idx) {
                return array_value(v, float32_value);
            }
        }
        "FLOAT8[]" => {
            if let Ok(v) = row.try_get::<Vec<Option<f64>>, _>(idx) {
                return array_value(v, float_value);
            }
        }
        "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => {
            if let Ok(v) = row.try_get::<Vec<Option<String>>, _>(idx) {
                return array_value(v, Value::String);
            }
        }
        "NUMERIC[]" => {
            if let Ok(v) = row.try_get::<Vec<Option<sqlx::types::BigDecimal>>, _>(idx) {
                return array_value(v, |d| Value::String(d.to_string()));
            }
        }
        _ => {}
    }

    row.try_get::<String, _>(idx)
        .map(Value::String)
        .or_else(|_| row.try_get::<i64, _>(idx).map(Value::from))
        .or_else(|_| row.try_get::<f64, _>(idx).map(float_value))
        .or_else(|_| row.try_get::<bool, _>(idx).map(Value::Bool))
        .unwrap_or_else(|_| undecoded_value(type_info.name()))
}

fn extract_mysql_value(row: &MySqlRow, idx: usize) -> Value {
    let Ok(vr) = row.try_get_raw(idx) else {
        return Value::Null;
    };
    if vr.is_null() {
        return Value::Null;
    }

    let type_info = vr.type_info().into_owned();

    match type_info.name() {
        "BOOLEAN" => {
            if let Ok(v) = row.try_get::<bool, _>(idx) {
                return Value::Bool(v);
            }
        }
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            if let Ok(v) = row.try_get::<i64, _>(idx) {
                return Value::from(v);
            }
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => {
            if let Ok(v) = row.try_get::<u64, _>(idx) {
                return Value::from(v);
            }
        }
        "YEAR" | "BIT" => {
            if let Ok(v) = row.try_get::<u64, _>(idx) {
                return Value::from(v);
            }
        }
        "FLOAT" => {
            if let Ok(v) = row.try_get::<f32, _>(idx) {
                return float32_value(v);
            }
        }
        "DOUBLE" => {
            if let Ok(v) = row.try_get::<f64, _>(idx) {
                return float_value(v);
            }
        }
        "DECIMAL" => {
            if let Ok(v) = row.try_get::<sqlx::types::BigDecimal, _>(idx) {
                return Value::String(v.to_string());
            }
        }
        "VARCHAR" | "CHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" | "SET" => {
            if let Ok(v) = row.try_get::<String, _>(idx) {
                return Value::String(v);
            }
        }
        "DATE" => {
            if let Ok(v) = row.try_get::<sqlx::types::chrono::NaiveDate, _>(idx) {
                return Value::String(v.to_string());
            }
        }
        "TIME" => {
            if let Ok(v) = row.try_get::<sqlx::types::chrono::NaiveTime, _>(idx) {
                return Value::String(v.to_string());
            }
        }
        "DATETIME" | "TIMESTAMP" => {
            if let Ok(v) = row.try_get::<sqlx::types::chrono::NaiveDateTime, _>(idx) {
                return Value::String(v.to_string());
            }
        }
        "JSON" => {
            if let Ok(v) = row.try_get::<sqlx::types::JsonValue, _>(idx) {
                return v;
            }
        }
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => {
            if let Ok(v) = row.try_get::<Vec<u8>, _>(idx) {
                return Value::String(format!("0x{}", hex::encode(v)));
            }
        }
        _ => {}
    }

    row.try_get::<String, _>(idx)
        .map(Value::String)
        .or_else(|_| row.try_get::<i64, _>(idx).map(Value::from))
        .or_else(|_| row.try_get::<f64, _>(idx).map(float_value))
        .or_else(|_| row.try_get::<bool, _>(idx).map(Value::Bool))
        .unwrap_or_else(|_| undecoded_value(type_info.name()))
}

fn extract_sqlite_value(row: &SqliteRow, idx: usize) -> Value {
    let Ok(vr) = row.try_get_raw(idx) else {
        return Value::Null;
    };
    if vr.is_null() {
        return Value::Null;
    }

    let type_info = vr.type_info().into_owned();

    match type_info.name() {
        "INTEGER" => {
            if let Ok(v) = row.try_get::<i64, _>(idx) {
                return Value::from(v);
            }
        }
        "REAL" => {
            if let Ok(v) = row.try_get::<f64, _>(idx) {
                return float_value(v);
            }
        }
        "TEXT" => {
            if let Ok(v) = row.try_get::<String, _>(idx) {
                return Value::String(v);
            }
        }
        "BLOB" => {
            if let Ok(v) = row.try_get::<Vec<u8>, _>(idx) {
                return Value::String(format!("X'{}'", hex::encode(v)));
            }
        }
        _ => {}
    }

    row.try_get::<String, _>(idx)
        .map(Value::String)
        .or_else(|_| row.try_get::<i64, _>(idx).map(Value::from))
        .or_else(|_| row.try_get::<f64, _>(idx).map(float_value))
        .or_else(|_| row.try_get::<Vec<u8>, _>(idx).map(|v| Value::String(format!("X'{}'", hex::encode(v)))))
        .unwrap_or_else(|_| undecoded_value(type_info.name()))
}
