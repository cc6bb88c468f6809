//! In-memory collaborators shared by unit and verification tests.

use crate::error::TargetError;
use crate::models::{RecordBatch, TargetConfig};
use crate::services::connection::{Connector, SqlConnection};
use crate::services::loader::{LoaderFactory, LoaderSettings, WarehouseLoader};

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_postgres::types::ToSql;

#[derive(Default)]
struct Inner {
    open_attempts: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
    fail_open: AtomicBool,
    statements: Mutex<Vec<String>>,
    failing: Mutex<Vec<String>>,
    batches: Mutex<Vec<RecordBatch>>,
}

/// Observable state shared between a test and its mocks.
#[derive(Clone, Default)]
pub struct MockState {
    inner: Arc<Inner>,
}

impl MockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `open` fail.
    pub fn fail_open(&self) {
        self.inner.fail_open.store(true, Ordering::SeqCst);
    }

    /// Make statements equal to `sql` fail with a query error.
    pub fn fail_on(&self, sql: &str) {
        self.inner.failing.lock().push(sql.to_string());
    }

    pub fn open_attempts(&self) -> usize {
        self.inner.open_attempts.load(Ordering::SeqCst)
    }

    pub fn opened_count(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    pub fn closed_count(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Every connection that was opened has been closed.
    pub fn all_closed(&self) -> bool {
        self.opened_count() == self.closed_count()
    }

    pub fn statements(&self) -> Vec<String> {
        self.inner.statements.lock().clone()
    }

    pub fn batches(&self) -> Vec<RecordBatch> {
        self.inner.batches.lock().clone()
    }

    fn run(&self, sql: &str) -> Result<(), TargetError> {
        self.inner.statements.lock().push(sql.to_string());
        if self.inner.failing.lock().iter().any(|s| s == sql) {
            return Err(TargetError::Query {
                message: format!("injected failure for `{sql}`"),
                detail: None,
                hint: None,
                code: Some("XX000".to_string()),
            });
        }
        Ok(())
    }
}

/// Connection that records statements instead of sending them.
pub struct MockConnection {
    state: MockState,
    in_transaction: bool,
    closed: bool,
}

impl MockConnection {
    pub fn new(state: MockState) -> Self {
        state.inner.opened.fetch_add(1, Ordering::SeqCst);
        Self { state, in_transaction: false, closed: false }
    }
}

#[async_trait]
impl SqlConnection for MockConnection {
    async fn execute(
        &mut self,
        sql: &str,
        _params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, TargetError> {
        self.state.run(sql).map(|_| 1)
    }

    async fn batch_execute(&mut self, sql: &str) -> Result<(), TargetError> {
        self.state.run(sql)
    }

    async fn begin(&mut self) -> Result<(), TargetError> {
        self.state.run("BEGIN")?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), TargetError> {
        self.in_transaction = false;
        self.state.run("COMMIT")
    }

    async fn rollback(&mut self) -> Result<(), TargetError> {
        self.in_transaction = false;
        self.state.run("ROLLBACK")
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.inner.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Connector handing out [`MockConnection`]s and counting attempts.
#[derive(Clone, Default)]
pub struct MockConnector {
    pub state: MockState,
}

impl MockConnector {
    pub fn new(state: MockState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, config: &TargetConfig) -> Result<Box<dyn SqlConnection>, TargetError> {
        self.state.inner.open_attempts.fetch_add(1, Ordering::SeqCst);
        if self.state.inner.fail_open.load(Ordering::SeqCst) {
            return Err(TargetError::connection_with_hint(
                format!("could not connect to server at \"{}\":{}", config.host, config.port),
                "Is the server running?",
            ));
        }
        Ok(Box::new(MockConnection::new(self.state.clone())))
    }
}

/// Loader that keeps every batch it receives.
pub struct RecordingLoader<'c> {
    conn: &'c mut dyn SqlConnection,
    settings: LoaderSettings,
    state: MockState,
}

#[async_trait]
impl<'c> WarehouseLoader for RecordingLoader<'c> {
    fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, TargetError> {
        self.conn.execute(sql, &[]).await
    }

    async fn before_run(&mut self) -> Result<(), TargetError> {
        Ok(())
    }

    async fn write_batch(&mut self, batch: &RecordBatch) -> Result<(), TargetError> {
        self.state.inner.batches.lock().push(batch.clone());
        Ok(())
    }

    async fn after_run(&mut self) -> Result<(), TargetError> {
        Ok(())
    }
}

/// Factory for [`RecordingLoader`].
#[derive(Clone, Default)]
pub struct RecordingLoaderFactory {
    pub state: MockState,
}

impl LoaderFactory for RecordingLoaderFactory {
    fn build<'c>(
        &self,
        conn: &'c mut dyn SqlConnection,
        config: &TargetConfig,
    ) -> Result<Box<dyn WarehouseLoader + 'c>, TargetError> {
        Ok(Box::new(RecordingLoader {
            conn,
            settings: LoaderSettings::from_config(config)?,
            state: self.state.clone(),
        }))
    }
}
