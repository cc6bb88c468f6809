//! Services behind one pgbridge invocation.
//!
//! - `config` - configuration loading and validation
//! - `io` - input/output bindings (`--input`/`--output`)
//! - `connection` - connection parameters, TLS and release
//! - `timed` - statement timing decorator
//! - `loader` - loader boundary, bootstrap and the PostgreSQL loader
//! - `engine` - stream engine boundary and the line-delimited engine
//! - `probe` - connectivity probe for test mode
//! - `stream` - delegation of the input stream to the engine

pub mod config;
pub mod connection;
pub mod engine;
pub mod io;
pub mod loader;
pub mod probe;
pub mod stream;
pub mod timed;

pub use config::load_config;
pub use connection::{
    release, ConnectionParams, Connector, PgConnection, PgConnector, SqlConnection,
};
pub use engine::{SingerEngine, StreamEngine};
pub use io::{CapturedOutput, InputSource, IoContext};
pub use loader::{
    LoaderFactory, LoaderSettings, PostgresLoader, PostgresLoaderFactory, WarehouseLoader,
};
pub use probe::probe;
pub use stream::{delegate, FINISHED_MARKER};
pub use timed::TimedExecutor;
