//! Data models for pgbridge.
//!
//! - `config` - TargetConfig, SslMode, LoggingLevel
//! - `message` - input stream messages and record batches
//! - `probe` - ProbeOutcome, ProbeResult

pub mod config;
pub mod message;
pub mod probe;

pub use config::{LoggingLevel, SslMode, TargetConfig, REQUIRED_CONFIG_KEYS};
pub use message::{Message, RecordBatch};
pub use probe::{ProbeOutcome, ProbeResult};
