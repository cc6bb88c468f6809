//! Statement timing decorator.
//!
//! [`TimedExecutor`] wraps any [`SqlConnection`] and logs how long every
//! statement took at a fixed level. Query semantics are unchanged: results
//! and errors pass through untouched.

use crate::error::TargetError;
use crate::services::connection::SqlConnection;

use async_trait::async_trait;
use std::future::Future;
use std::time::Instant;
use tokio_postgres::types::ToSql;
use tracing::Level;

/// `tracing` macros need a constant level, so dispatch on it here.
macro_rules! event_at {
    ($level:expr, $($arg:tt)+) => {{
        let level: Level = $level;
        if level == Level::ERROR {
            tracing::error!($($arg)+)
        } else if level == Level::WARN {
            tracing::warn!($($arg)+)
        } else if level == Level::INFO {
            tracing::info!($($arg)+)
        } else if level == Level::DEBUG {
            tracing::debug!($($arg)+)
        } else {
            tracing::trace!($($arg)+)
        }
    }};
}

/// Connection wrapper recording each statement's wall-clock duration.
pub struct TimedExecutor<C> {
    inner: C,
    level: Level,
}

impl<C: SqlConnection> TimedExecutor<C> {
    /// Wrap `inner`, logging timings at `level`.
    pub fn new(inner: C, level: Level) -> Self {
        Self { inner, level }
    }

    /// Level timings are logged at.
    pub fn level(&self) -> Level {
        self.level
    }

    async fn timed<T, F>(level: Level, sql: &str, fut: F) -> Result<T, TargetError>
    where
        T: Send,
        F: Future<Output = Result<T, TargetError>> + Send,
    {
        let start = Instant::now();
        let result = fut.await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        let statement = statement_preview(sql);
        match &result {
            Ok(_) => event_at!(level, elapsed_ms, statement, "Statement executed"),
            Err(e) => event_at!(level, elapsed_ms, statement, error = %e, "Statement failed"),
        }
        result
    }
}

/// First line of a statement, truncated for log output.
fn statement_preview(sql: &str) -> &str {
    const MAX_PREVIEW: usize = 120;
    let line = sql.trim_start().lines().next().unwrap_or_default();
    if line.len() <= MAX_PREVIEW {
        return line;
    }
    let mut end = MAX_PREVIEW;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

#[async_trait]
impl<C: SqlConnection> SqlConnection for TimedExecutor<C> {
    async fn execute(
        &mut self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, TargetError> {
        Self::timed(self.level, sql, self.inner.execute(sql, params)).await
    }

    async fn batch_execute(&mut self, sql: &str) -> Result<(), TargetError> {
        Self::timed(self.level, sql, self.inner.batch_execute(sql)).await
    }

    async fn begin(&mut self) -> Result<(), TargetError> {
        Self::timed(self.level, "BEGIN", self.inner.begin()).await
    }

    async fn commit(&mut self) -> Result<(), TargetError> {
        Self::timed(self.level, "COMMIT", self.inner.commit()).await
    }

    async fn rollback(&mut self) -> Result<(), TargetError> {
        Self::timed(self.level, "ROLLBACK", self.inner.rollback()).await
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    async fn close(&mut self) {
        self.inner.close().await
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::io::CapturedOutput;
    use crate::testing::{MockConnection, MockState};

    #[tokio::test]
    async fn test_delegates_to_inner_connection() {
        let state = MockState::new();
        let mut timed = TimedExecutor::new(MockConnection::new(state.clone()), Level::INFO);

        timed.batch_execute("SELECT 1").await.unwrap();
        timed.begin().await.unwrap();
        assert!(timed.in_transaction());
        timed.execute("INSERT INTO t VALUES ($1)", &[&1i32]).await.unwrap();
        timed.commit().await.unwrap();

        assert_eq!(
            state.statements(),
            vec!["SELECT 1", "BEGIN", "INSERT INTO t VALUES ($1)", "COMMIT"]
        );
        assert_eq!(timed.level(), Level::INFO);
    }

    #[tokio::test]
    async fn test_errors_pass_through_unchanged() {
        let state = MockState::new();
        state.fail_on("SELECT broken");
        let mut timed = TimedExecutor::new(MockConnection::new(state.clone()), Level::DEBUG);

        let err = timed.batch_execute("SELECT broken").await.unwrap_err();
        assert!(matches!(err, TargetError::Query { .. }));
    }

    #[tokio::test]
    async fn test_close_reaches_inner() {
        let state = MockState::new();
        let mut timed = TimedExecutor::new(MockConnection::new(state.clone()), Level::DEBUG);

        assert!(!timed.is_closed());
        timed.close().await;
        assert!(timed.is_closed());
        assert_eq!(state.closed_count(), 1);
    }

    fn capture_at_info() -> (CapturedOutput, tracing::subscriber::DefaultGuard) {
        let captured = CapturedOutput::new();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(Level::INFO)
            .with_ansi(false)
            .without_time()
            .finish();
        (captured, tracing::subscriber::set_default(subscriber))
    }

    #[tokio::test]
    async fn test_statement_timing_logged_at_configured_level() {
        let (captured, _guard) = capture_at_info();
        let state = MockState::new();
        let mut timed = TimedExecutor::new(MockConnection::new(state), Level::INFO);

        timed.batch_execute("SELECT 1").await.unwrap();

        let events: Vec<String> =
            captured.lines().into_iter().filter(|l| l.contains("Statement executed")).collect();
        assert_eq!(events.len(), 1, "{events:?}");
        assert!(events[0].contains("INFO"));
        assert!(events[0].contains("elapsed_ms="));
        assert!(events[0].contains("statement="));
        assert!(events[0].contains("SELECT 1"));
    }

    #[tokio::test]
    async fn test_statement_timing_below_filter_is_silent() {
        let (captured, _guard) = capture_at_info();
        let state = MockState::new();
        let mut timed = TimedExecutor::new(MockConnection::new(state), Level::DEBUG);

        timed.batch_execute("SELECT 1").await.unwrap();

        assert!(!captured.contents().contains("Statement executed"));
    }

    #[test]
    fn test_statement_preview_truncates() {
        assert_eq!(statement_preview("  SELECT 1\nFROM t"), "SELECT 1");
        let long = "x".repeat(500);
        assert_eq!(statement_preview(&long).len(), 120);
    }
}
