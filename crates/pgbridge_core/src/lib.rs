//! Core of the pgbridge PostgreSQL target.
//!
//! This crate provides the harness between a message stream and PostgreSQL:
//!
//! - **error**: Error taxonomy with PostgreSQL-specific details
//! - **models**: Configuration, stream messages and probe results
//! - **services**: Config loading, I/O bindings, connections, loader, engine, probe
//! - **harness**: Invocation lifecycle and connection release
//! - **logging**: Structured logging setup

pub mod error;
pub mod harness;
pub mod logging;
pub mod models;
pub mod services;

#[cfg(test)]
mod testing;

pub use error::TargetError;
pub use harness::{Harness, Invocation, InvocationArgs, Stage};
pub use models::{LoggingLevel, Message, ProbeResult, RecordBatch, SslMode, TargetConfig};
pub use services::{
    CapturedOutput, Connector, InputSource, IoContext, LoaderFactory, SqlConnection,
    StreamEngine, WarehouseLoader, FINISHED_MARKER,
};
