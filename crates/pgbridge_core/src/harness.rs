//! Invocation lifecycle.
//!
//! One process run is one [`Invocation`]:
//!
//! ```text
//! Start → ConfigLoaded → Probed → Done                              (test mode)
//! Start → ConfigLoaded → Connected → LoaderBuilt → Delegated → Done (normal mode)
//! ```
//!
//! Any failure moves to `Failed`. The connection, once opened, is released on
//! every path out of [`Harness::execute`].

use crate::error::TargetError;
use crate::models::TargetConfig;
use crate::services::connection::{release, Connector, PgConnector, SqlConnection};
use crate::services::engine::{SingerEngine, StreamEngine};
use crate::services::io::IoContext;
use crate::services::loader::{LoaderFactory, PostgresLoaderFactory};
use crate::services::{config, probe, stream};

use std::path::PathBuf;
use tracing::Instrument;
use uuid::Uuid;

/// Parsed command-line invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationArgs {
    /// `--config`
    pub config_path: PathBuf,
    /// `--input`
    pub input_path: Option<PathBuf>,
    /// `--output`
    pub output_path: Option<PathBuf>,
    /// `--test`
    pub test_mode: bool,
}

/// Where an invocation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    ConfigLoaded,
    Probed,
    Connected,
    LoaderBuilt,
    Delegated,
    Done,
    Failed,
}

/// State for a single run.
#[derive(Debug)]
pub struct Invocation {
    id: Uuid,
    stage: Stage,
    config: TargetConfig,
    io: IoContext,
    test_mode: bool,
}

impl Invocation {
    /// Build from an already loaded configuration and I/O bindings.
    pub fn new(config: TargetConfig, io: IoContext, test_mode: bool) -> Self {
        let mut invocation =
            Self { id: Uuid::new_v4(), stage: Stage::Start, config, io, test_mode };
        invocation.advance(Stage::ConfigLoaded);
        invocation
    }

    /// Load configuration, then bind input/output.
    ///
    /// Both steps finish before any connection is attempted.
    pub fn prepare(args: &InvocationArgs) -> Result<Self, TargetError> {
        let config = config::load_config(&args.config_path)?;
        let io = IoContext::from_paths(args.input_path.as_deref(), args.output_path.as_deref())?;
        Ok(Self::new(config, io, args.test_mode))
    }

    /// Unique id used in log spans.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Loaded configuration.
    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    /// Whether this is a test-mode run.
    pub fn is_test_mode(&self) -> bool {
        self.test_mode
    }

    fn advance(&mut self, next: Stage) {
        tracing::debug!(
            invocation_id = %self.id,
            from = ?self.stage,
            to = ?next,
            "Stage transition"
        );
        self.stage = next;
    }
}

/// Wires the connector, loader factory and stream engine together.
pub struct Harness {
    connector: Box<dyn Connector>,
    loaders: Box<dyn LoaderFactory>,
    engine: Box<dyn StreamEngine>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::postgres()
    }
}

impl Harness {
    /// Harness with the PostgreSQL connector, loader and line-delimited engine.
    pub fn postgres() -> Self {
        Self::new(
            Box::new(PgConnector::new()),
            Box::new(PostgresLoaderFactory),
            Box::new(SingerEngine::new()),
        )
    }

    /// Harness with custom collaborators.
    pub fn new(
        connector: Box<dyn Connector>,
        loaders: Box<dyn LoaderFactory>,
        engine: Box<dyn StreamEngine>,
    ) -> Self {
        Self { connector, loaders, engine }
    }

    /// Prepare and execute an invocation from command-line arguments.
    pub async fn run(&self, args: &InvocationArgs) -> Result<Invocation, TargetError> {
        let mut invocation = Invocation::prepare(args)?;
        self.execute(&mut invocation).await?;
        Ok(invocation)
    }

    /// Execute a prepared invocation in test or normal mode.
    pub async fn execute(&self, invocation: &mut Invocation) -> Result<(), TargetError> {
        let span =
            tracing::info_span!("invocation", id = %invocation.id, test = invocation.test_mode);
        async {
            let result = if invocation.test_mode {
                self.run_probe(invocation).await
            } else {
                self.run_pipeline(invocation).await
            };

            match &result {
                Ok(()) => invocation.advance(Stage::Done),
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        category = e.category(),
                        sqlstate = e.pg_code().unwrap_or_default(),
                        stage = ?invocation.stage,
                        "Invocation failed"
                    );
                    invocation.advance(Stage::Failed);
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_probe(&self, invocation: &mut Invocation) -> Result<(), TargetError> {
        let result =
            probe::probe(self.connector.as_ref(), self.loaders.as_ref(), &invocation.config).await;
        invocation.advance(Stage::Probed);

        let line = serde_json::to_string(&result)
            .map_err(|e| TargetError::internal(format!("Failed to encode probe result: {e}")))?;
        invocation.io.write_line(&line)
    }

    async fn run_pipeline(&self, invocation: &mut Invocation) -> Result<(), TargetError> {
        let mut conn = self.connector.open(&invocation.config).await?;
        invocation.advance(Stage::Connected);

        let result = self.load(conn.as_mut(), invocation).await;
        release(conn, result.is_ok()).await;
        result
    }

    async fn load(
        &self,
        conn: &mut dyn SqlConnection,
        invocation: &mut Invocation,
    ) -> Result<(), TargetError> {
        let mut loader = self.loaders.build(conn, &invocation.config)?;
        invocation.advance(Stage::LoaderBuilt);

        stream::delegate(
            self.engine.as_ref(),
            loader.as_mut(),
            &invocation.config,
            &mut invocation.io,
        )
        .await?;
        invocation.advance(Stage::Delegated);
        Ok(())
    }
}
