//! Relational database source (PostgreSQL, MySQL)
//!
//! Every call opens its own connection and closes it before returning.
//! Rows are decoded into JSON using the type names the server reports.

use async_trait::async_trait;
use serde_json::{Number, Value};
use sluice_core::domain::connection::DatabaseConnectionConfig;
use sluice_core::domain::node::{DatabaseSourceOptions, Node};
use sluice_core::domain::record::{Record, RecordSet};
use sluice_core::dto::connection::ConnectionTestResult;
use sluice_core::dto::preview::{ColumnInfo, PreviewRequest, PreviewResponse};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::types::Decimal;
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{Column, ColumnIndex, Connection, Decode, Row, Type, TypeInfo};
use std::time::Duration;
use tracing::{debug, warn};

use super::{ConnectionConfig, SourceAdapter};
use crate::config::EngineConfig;
use crate::error::AdapterError;

/// SQL flavour of a database connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
}

impl Dialect {
    fn default_port(&self) -> u16 {
        match self {
            Dialect::Postgres => 5432,
            Dialect::MySql => 3306,
        }
    }

    /// Quotes an identifier so its case survives
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            Dialect::Postgres => format!("\"{}\"", name.replace('"', "\"\"")),
            Dialect::MySql => format!("`{}`", name.replace('`', "``")),
        }
    }

    fn first_table_query(&self) -> &'static str {
        match self {
            Dialect::Postgres => {
                "SELECT table_name::text FROM information_schema.tables \
                 WHERE table_schema = 'public' ORDER BY table_name LIMIT 1"
            }
            Dialect::MySql => {
                "SELECT CAST(table_name AS CHAR) FROM information_schema.tables \
                 WHERE table_schema = DATABASE() ORDER BY table_name LIMIT 1"
            }
        }
    }
}

/// A statement and how it is sent to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Generated SQL, run as a prepared statement
    Prepared(String),
    /// User-written SQL, sent as-is over the simple query protocol
    Verbatim(String),
}

impl Statement {
    pub fn sql(&self) -> &str {
        match self {
            Statement::Prepared(sql) | Statement::Verbatim(sql) => sql,
        }
    }
}

/// Resolves the statement a source node runs
///
/// Precedence: the node's custom query, the node's table, the connection's
/// default table. The row limit is appended unless the statement already
/// carries a `LIMIT` clause.
pub fn resolve_query(
    dialect: Dialect,
    options: &DatabaseSourceOptions,
    default_table: Option<&str>,
) -> Result<Statement, AdapterError> {
    let non_empty = |s: &Option<String>| {
        s.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let limited = |query: String| match options.limit {
        Some(limit) => with_limit(query, limit),
        None => query,
    };

    if let Some(query) = non_empty(&options.query) {
        Ok(Statement::Verbatim(limited(query)))
    } else if let Some(table) = non_empty(&options.table)
        .or_else(|| default_table.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string))
    {
        Ok(Statement::Prepared(limited(format!(
            "SELECT * FROM {}",
            dialect.quote_identifier(&table)
        ))))
    } else {
        Err(AdapterError::NoQueryOrTable)
    }
}

fn with_limit(query: String, limit: u64) -> String {
    if query.to_ascii_uppercase().contains("LIMIT") {
        query
    } else {
        format!("{} LIMIT {}", query.trim_end().trim_end_matches(';'), limit)
    }
}

/// Failure of a single-statement round trip
#[derive(Debug)]
enum RunError {
    Connect(sqlx::Error),
    Query(sqlx::Error),
}

impl RunError {
    fn into_fetch_error(self) -> AdapterError {
        match self {
            RunError::Connect(e) => AdapterError::Connection(e.to_string()),
            RunError::Query(e) => AdapterError::SourceFetch(e.to_string()),
        }
    }

    fn into_preview_error(self) -> AdapterError {
        match self {
            RunError::Connect(e) | RunError::Query(e) => AdapterError::DatabasePreview(e.to_string()),
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Connect(e) | RunError::Query(e) => std::fmt::Display::fmt(e, f),
        }
    }
}

/// Reads records from PostgreSQL or MySQL
pub struct DatabaseSource {
    dialect: Dialect,
    test_timeout: Duration,
}

impl DatabaseSource {
    pub fn new(dialect: Dialect, config: &EngineConfig) -> Self {
        Self {
            dialect,
            test_timeout: config.test_timeout,
        }
    }

    async fn connect(&self, settings: &DatabaseConnectionConfig) -> Result<DbSession, sqlx::Error> {
        let port = settings.port.unwrap_or(self.dialect.default_port());

        match self.dialect {
            Dialect::Postgres => {
                let options = PgConnectOptions::new()
                    .host(&settings.host)
                    .port(port)
                    .database(&settings.database)
                    .username(&settings.username)
                    .password(&settings.password);
                Ok(DbSession::Postgres(PgConnection::connect_with(&options).await?))
            }
            Dialect::MySql => {
                let options = MySqlConnectOptions::new()
                    .host(&settings.host)
                    .port(port)
                    .database(&settings.database)
                    .username(&settings.username)
                    .password(&settings.password);
                Ok(DbSession::MySql(MySqlConnection::connect_with(&options).await?))
            }
        }
    }

    /// Opens a connection, runs one statement and closes the connection
    async fn run(
        &self,
        settings: &DatabaseConnectionConfig,
        statement: &Statement,
    ) -> Result<(Vec<ColumnInfo>, RecordSet), RunError> {
        let mut session = self.connect(settings).await.map_err(RunError::Connect)?;
        let result = session.query(statement).await.map_err(RunError::Query);
        session.close().await;
        result
    }

    async fn first_table(
        &self,
        settings: &DatabaseConnectionConfig,
    ) -> Result<Option<String>, RunError> {
        let statement = Statement::Prepared(self.dialect.first_table_query().to_string());
        let (_, rows) = self.run(settings, &statement).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .and_then(|(_, value)| value.as_str().map(str::to_string)))
    }
}

#[async_trait]
impl SourceAdapter for DatabaseSource {
    async fn fetch(
        &self,
        connection: &ConnectionConfig,
        node: &Node,
    ) -> Result<RecordSet, AdapterError> {
        let settings: DatabaseConnectionConfig = connection.parse()?;
        let options: DatabaseSourceOptions = node
            .typed_config()
            .map_err(|e| AdapterError::InvalidNodeConfig(e.to_string()))?;

        let statement = resolve_query(self.dialect, &options, settings.table.as_deref())?;
        debug!("Executing source query: {}", statement.sql());

        let (_, records) = self
            .run(&settings, &statement)
            .await
            .map_err(RunError::into_fetch_error)?;

        Ok(records)
    }

    async fn preview(
        &self,
        connection: &ConnectionConfig,
        request: &PreviewRequest,
        limit: u64,
    ) -> Result<PreviewResponse, AdapterError> {
        let settings: DatabaseConnectionConfig = connection.parse()?;
        let custom = request
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());

        let statement = match custom {
            Some(query) => Statement::Verbatim(with_limit(query.to_string(), limit)),
            None => {
                let table = match settings.table.as_deref().filter(|t| !t.is_empty()) {
                    Some(table) => table.to_string(),
                    None => self
                        .first_table(&settings)
                        .await
                        .map_err(RunError::into_preview_error)?
                        .ok_or(AdapterError::NoTablesFound)?,
                };
                Statement::Prepared(format!(
                    "SELECT * FROM {} LIMIT {}",
                    self.dialect.quote_identifier(&table),
                    limit
                ))
            }
        };
        debug!("Executing preview query: {}", statement.sql());

        let (columns, data) = self
            .run(&settings, &statement)
            .await
            .map_err(RunError::into_preview_error)?;

        Ok(PreviewResponse {
            count: data.len(),
            data,
            columns,
            data_source_type: connection.connection_type(),
        })
    }

    async fn test_connection(&self, connection: &ConnectionConfig) -> ConnectionTestResult {
        let settings: DatabaseConnectionConfig = match connection.parse() {
            Ok(settings) => settings,
            Err(e) => return ConnectionTestResult::failed(e.to_string()),
        };

        let statement = Statement::Prepared("SELECT 1".to_string());
        match tokio::time::timeout(self.test_timeout, self.run(&settings, &statement)).await {
            Ok(Ok(_)) => ConnectionTestResult::ok("Connection successful"),
            Ok(Err(e)) => ConnectionTestResult::failed(e.to_string()),
            Err(_) => ConnectionTestResult::failed(format!(
                "Connection timed out after {}s",
                self.test_timeout.as_secs()
            )),
        }
    }
}

// =============================================================================
// Sessions and row decoding
// =============================================================================

enum DbSession {
    Postgres(PgConnection),
    MySql(MySqlConnection),
}

impl DbSession {
    async fn query(
        &mut self,
        statement: &Statement,
    ) -> Result<(Vec<ColumnInfo>, RecordSet), sqlx::Error> {
        match self {
            DbSession::Postgres(conn) => {
                let rows = match statement {
                    Statement::Prepared(sql) => sqlx::query(sql).fetch_all(&mut *conn).await?,
                    Statement::Verbatim(sql) => sqlx::Executor::fetch_all(&mut *conn, sqlx::raw_sql(sql)).await?,
                };
                let columns = rows.first().map(columns_of).unwrap_or_default();
                let records = rows.iter().map(pg_record).collect::<Result<_, _>>()?;
                Ok((columns, records))
            }
            DbSession::MySql(conn) => {
                let rows = match statement {
                    Statement::Prepared(sql) => sqlx::query(sql).fetch_all(&mut *conn).await?,
                    Statement::Verbatim(sql) => sqlx::Executor::fetch_all(&mut *conn, sqlx::raw_sql(sql)).await?,
                };
                let columns = rows.first().map(columns_of).unwrap_or_default();
                let records = rows.iter().map(mysql_record).collect::<Result<_, _>>()?;
                Ok((columns, records))
            }
        }
    }

    async fn close(self) {
        let closed = match self {
            DbSession::Postgres(conn) => conn.close().await,
            DbSession::MySql(conn) => conn.close().await,
        };
        if let Err(e) = closed {
            warn!("Failed to close database connection cleanly: {}", e);
        }
    }
}

fn columns_of<R: Row>(row: &R) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|column| ColumnInfo {
            name: column.name().to_string(),
            column_type: column.type_info().name().to_string(),
        })
        .collect()
}

/// Decodes a nullable cell, converting a present value with `to_json`
fn cell<'r, R, T>(
    row: &'r R,
    index: usize,
    to_json: impl FnOnce(T) -> Value,
) -> Result<Value, sqlx::Error>
where
    R: Row,
    T: Decode<'r, R::Database> + Type<R::Database>,
    usize: ColumnIndex<R>,
{
    Ok(row
        .try_get::<Option<T>, _>(index)?
        .map(to_json)
        .unwrap_or(Value::Null))
}

fn float(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

fn pg_record(row: &PgRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();

    for (index, column) in row.columns().iter().enumerate() {
        let type_name = column.type_info().name();
        let value = match type_name {
            "BOOL" => cell(row, index, Value::Bool)?,
            "INT2" => cell(row, index, |v: i16| Value::from(v))?,
            "INT4" => cell(row, index, |v: i32| Value::from(v))?,
            "INT8" => cell(row, index, |v: i64| Value::from(v))?,
            "FLOAT4" => cell(row, index, |v: f32| float(f64::from(v)))?,
            "FLOAT8" => cell(row, index, float)?,
            "NUMERIC" => cell(row, index, |v: Decimal| Value::String(v.to_string()))?,
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" | "CITEXT" => {
                cell(row, index, Value::String)?
            }
            "UUID" => cell(row, index, |v: uuid::Uuid| Value::String(v.to_string()))?,
            "JSON" | "JSONB" => cell(row, index, |v: Value| v)?,
            "TIMESTAMPTZ" => cell(row, index, |v: DateTime<Utc>| Value::String(v.to_rfc3339()))?,
            "TIMESTAMP" => cell(row, index, |v: NaiveDateTime| Value::String(v.to_string()))?,
            "DATE" => cell(row, index, |v: NaiveDate| Value::String(v.to_string()))?,
            "TIME" => cell(row, index, |v: NaiveTime| Value::String(v.to_string()))?,
            other => {
                warn!(
                    "Column '{}' has unsupported type {}; returning null",
                    column.name(),
                    other
                );
                Value::Null
            }
        };
        record.insert(column.name().to_string(), value);
    }

    Ok(record)
}

fn mysql_record(row: &MySqlRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();

    for (index, column) in row.columns().iter().enumerate() {
        let type_name = column.type_info().name();
        let value = match type_name {
            "BOOLEAN" => cell(row, index, Value::Bool)?,
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                cell(row, index, |v: i64| Value::from(v))?
            }
            "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
            | "BIGINT UNSIGNED" => cell(row, index, |v: u64| Value::from(v))?,
            "FLOAT" => cell(row, index, |v: f32| float(f64::from(v)))?,
            "DOUBLE" => cell(row, index, float)?,
            "DECIMAL" => cell(row, index, |v: Decimal| Value::String(v.to_string()))?,
            "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM"
            | "SET" => cell(row, index, Value::String)?,
            "JSON" => cell(row, index, |v: Value| v)?,
            "TIMESTAMP" => cell(row, index, |v: DateTime<Utc>| Value::String(v.to_rfc3339()))?,
            "DATETIME" => cell(row, index, |v: NaiveDateTime| Value::String(v.to_string()))?,
            "DATE" => cell(row, index, |v: NaiveDate| Value::String(v.to_string()))?,
            "TIME" => cell(row, index, |v: NaiveTime| Value::String(v.to_string()))?,
            other => {
                warn!(
                    "Column '{}' has unsupported type {}; returning null",
                    column.name(),
                    other
                );
                Value::Null
            }
        };
        record.insert(column.name().to_string(), value);
    }

    Ok(record)
}
