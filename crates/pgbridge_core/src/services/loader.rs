//! Warehouse loader boundary and bootstrap.
//!
//! [`LoaderFactory::build`] binds a loader to the invocation's single
//! connection. Construction is pure: it validates the policy knobs and runs
//! no SQL. The bundled [`PostgresLoader`] runs the configured hooks verbatim
//! and appends batches to tables that already exist.

use crate::error::TargetError;
use crate::models::{LoggingLevel, RecordBatch, TargetConfig};
use crate::services::connection::SqlConnection;

use async_trait::async_trait;
use serde_json::Value;

/// PostgreSQL's identifier length limit (NAMEDATALEN - 1).
const MAX_IDENTIFIER_LEN: usize = 63;

/// Policy knobs recorded at construction for the load phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderSettings {
    pub schema: String,
    pub logging_level: Option<LoggingLevel>,
    pub persist_empty_tables: bool,
    pub add_upsert_indexes: bool,
    pub before_run_sql: Option<String>,
    pub after_run_sql: Option<String>,
}

impl LoaderSettings {
    /// Capture settings from configuration, validating the schema name.
    pub fn from_config(config: &TargetConfig) -> Result<Self, TargetError> {
        validate_schema_name(&config.schema)?;
        Ok(Self {
            schema: config.schema.clone(),
            logging_level: config.logging_level,
            persist_empty_tables: config.persist_empty_tables,
            add_upsert_indexes: config.add_upsert_indexes,
            before_run_sql: config.before_run_sql.clone(),
            after_run_sql: config.after_run_sql.clone(),
        })
    }
}

/// Check a target schema name against PostgreSQL's identifier rules.
pub fn validate_schema_name(schema: &str) -> Result<(), TargetError> {
    if schema.is_empty() {
        return Err(TargetError::loader_config("schema name must not be empty"));
    }
    if schema.len() > MAX_IDENTIFIER_LEN {
        return Err(TargetError::loader_config(format!(
            "schema name `{schema}` exceeds {MAX_IDENTIFIER_LEN} bytes"
        )));
    }
    if schema.contains('\0') {
        return Err(TargetError::loader_config("schema name must not contain NUL bytes"));
    }
    if schema.to_lowercase().starts_with("pg_") {
        return Err(TargetError::loader_config(format!(
            "schema name `{schema}` uses the reserved pg_ prefix"
        )));
    }
    Ok(())
}

/// Map a stream name to its table name.
///
/// Lowercases, replaces anything outside `[a-z0-9_]` with `_` and truncates
/// to the identifier limit.
pub fn table_name(stream: &str) -> Result<String, TargetError> {
    if stream.is_empty() {
        return Err(TargetError::delegation("stream name must not be empty"));
    }
    let mut name: String = stream
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' { c } else { '_' })
        .collect();
    name.truncate(MAX_IDENTIFIER_LEN);
    Ok(name)
}

/// Quote an identifier for interpolation into SQL.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Loader collaborator driven by the stream engine.
#[async_trait]
pub trait WarehouseLoader: Send {
    /// Settings captured at construction.
    fn settings(&self) -> &LoaderSettings;

    /// Low-level statement execution on the bound connection.
    async fn execute(&mut self, sql: &str) -> Result<u64, TargetError>;

    /// Called once before the first message.
    async fn before_run(&mut self) -> Result<(), TargetError>;

    /// Load one batch of records.
    async fn write_batch(&mut self, batch: &RecordBatch) -> Result<(), TargetError>;

    /// Called once after the last message.
    async fn after_run(&mut self) -> Result<(), TargetError>;
}

/// Builds a loader bound to exactly one connection.
pub trait LoaderFactory: Send + Sync {
    /// Construct the loader. Must not execute SQL.
    fn build<'c>(
        &self,
        conn: &'c mut dyn SqlConnection,
        config: &TargetConfig,
    ) -> Result<Box<dyn WarehouseLoader + 'c>, TargetError>;
}

/// Factory for [`PostgresLoader`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresLoaderFactory;

impl LoaderFactory for PostgresLoaderFactory {
    fn build<'c>(
        &self,
        conn: &'c mut dyn SqlConnection,
        config: &TargetConfig,
    ) -> Result<Box<dyn WarehouseLoader + 'c>, TargetError> {
        Ok(Box::new(PostgresLoader::new(conn, LoaderSettings::from_config(config)?)))
    }
}

/// Loader writing batches into existing PostgreSQL tables.
pub struct PostgresLoader<'c> {
    conn: &'c mut dyn SqlConnection,
    settings: LoaderSettings,
}

impl<'c> PostgresLoader<'c> {
    /// Bind a loader to a connection.
    pub fn new(conn: &'c mut dyn SqlConnection, settings: LoaderSettings) -> Self {
        tracing::debug!(
            schema = %settings.schema,
            persist_empty_tables = settings.persist_empty_tables,
            add_upsert_indexes = settings.add_upsert_indexes,
            has_before_run_sql = settings.before_run_sql.is_some(),
            has_after_run_sql = settings.after_run_sql.is_some(),
            "Loader constructed"
        );
        Self { conn, settings }
    }

    /// Qualified, quoted table for a stream.
    pub fn qualified_table(&self, stream: &str) -> Result<String, TargetError> {
        Ok(format!("{}.{}", quote_ident(&self.settings.schema), quote_ident(&table_name(stream)?)))
    }

    async fn run_hook(&mut self, name: &str, sql: Option<String>) -> Result<(), TargetError> {
        let Some(sql) = sql else {
            return Ok(());
        };
        tracing::info!(hook = name, "Running hook SQL");
        self.conn.batch_execute(&sql).await
    }
}

#[async_trait]
impl<'c> WarehouseLoader for PostgresLoader<'c> {
    fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, TargetError> {
        self.conn.execute(sql, &[]).await
    }

    async fn before_run(&mut self) -> Result<(), TargetError> {
        let sql = self.settings.before_run_sql.clone();
        self.run_hook("before_run_sql", sql).await
    }

    async fn write_batch(&mut self, batch: &RecordBatch) -> Result<(), TargetError> {
        if batch.is_empty() {
            tracing::debug!(
                stream = %batch.stream,
                persist_empty_tables = self.settings.persist_empty_tables,
                "Skipping empty batch"
            );
            return Ok(());
        }

        let table = self.qualified_table(&batch.stream)?;
        let sql = format!(
            "INSERT INTO {table} SELECT * FROM jsonb_populate_recordset(NULL::{table}, $1::jsonb)"
        );
        let payload = Value::Array(batch.records.clone());

        self.conn.begin().await?;
        match self.conn.execute(&sql, &[&payload]).await {
            Ok(rows) => {
                self.conn.commit().await?;
                tracing::info!(stream = %batch.stream, table = %table, rows, "Batch loaded");
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_err) = self.conn.rollback().await {
                    tracing::warn!(
                        error = %rollback_err,
                        "Rollback after failed batch also failed"
                    );
                }
                tracing::warn!(stream = %batch.stream, error = %e, "Batch failed");
                Err(e)
            }
        }
    }

    async fn after_run(&mut self) -> Result<(), TargetError> {
        let sql = self.settings.after_run_sql.clone();
        self.run_hook("after_run_sql", sql).await
    }
}
