//! Target configuration, SSL mode and logging level models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

/// Keys that must be present in every configuration document.
pub const REQUIRED_CONFIG_KEYS: &[&str] = &["database"];

/// SSL mode for database connections, spelled the way libpq spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SslMode {
    /// No SSL
    Disable,
    /// Plaintext first in libpq; treated like `Prefer` here
    Allow,
    /// Use SSL if the server supports it
    Prefer,
    /// Require SSL, accept any certificate unless a root cert is configured
    Require,
    /// Require SSL, verify the certificate chain
    VerifyCa,
    /// Require SSL, verify chain and hostname
    VerifyFull,
}

impl SslMode {
    /// Convert to the libpq spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disable => "disable",
            Self::Allow => "allow",
            Self::Prefer => "prefer",
            Self::Require => "require",
            Self::VerifyCa => "verify-ca",
            Self::VerifyFull => "verify-full",
        }
    }

    /// Parse from the libpq spelling. Returns `None` for unknown modes.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "disable" => Some(Self::Disable),
            "allow" => Some(Self::Allow),
            "prefer" => Some(Self::Prefer),
            "require" => Some(Self::Require),
            "verify-ca" | "verify_ca" => Some(Self::VerifyCa),
            "verify-full" | "verify_full" => Some(Self::VerifyFull),
            _ => None,
        }
    }

    /// Whether the server certificate chain must be verified.
    pub fn verifies_chain(&self) -> bool {
        matches!(self, Self::VerifyCa | Self::VerifyFull)
    }
}

impl TryFrom<String> for SslMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unknown sslmode `{value}`"))
    }
}

impl From<SslMode> for String {
    fn from(mode: SslMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging verbosity named in the configuration.
///
/// Accepts the level names operators already use for Singer targets
/// (`DEBUG`, `INFO`, `WARNING`, `ERROR`, `CRITICAL`) in any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LoggingLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LoggingLevel {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// Parse a level name. Returns `None` for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DEBUG" | "TRACE" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARNING" | "WARN" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            "CRITICAL" | "FATAL" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Matching `tracing` level. `CRITICAL` has no counterpart and maps to `ERROR`.
    pub fn tracing_level(&self) -> tracing::Level {
        match self {
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warning => tracing::Level::WARN,
            Self::Error | Self::Critical => tracing::Level::ERROR,
        }
    }

    /// Directive usable in an `EnvFilter`.
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}

impl TryFrom<String> for LoggingLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        Self::parse(&value).ok_or_else(|| format!("unknown logging_level `{value}`"))
    }
}

impl From<LoggingLevel> for String {
    fn from(level: LoggingLevel) -> Self {
        level.as_str().to_string()
    }
}

/// Validated configuration for one invocation.
///
/// Loaded once by [`load_config`](crate::services::config::load_config) and
/// only ever read afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database name (required, non-empty)
    pub database: String,
    /// Server hostname or IP
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login username; unset lets the driver pick its default
    #[serde(default)]
    pub username: Option<String>,
    /// Login password
    #[serde(default)]
    pub password: Option<String>,
    /// TLS negotiation mode; unset keeps the driver default (`prefer`)
    #[serde(default)]
    pub sslmode: Option<SslMode>,
    /// Client certificate (PEM)
    #[serde(default)]
    pub sslcert: Option<PathBuf>,
    /// Client private key (PEM, PKCS#8)
    #[serde(default)]
    pub sslkey: Option<PathBuf>,
    /// Root certificate used to verify the server (PEM)
    #[serde(default)]
    pub sslrootcert: Option<PathBuf>,
    /// Certificate revocation list
    #[serde(default)]
    pub sslcrl: Option<PathBuf>,
    /// Target schema
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Verbosity for logs and statement timing
    #[serde(default)]
    pub logging_level: Option<LoggingLevel>,
    /// Whether streams that received no records should still be loaded
    #[serde(default)]
    pub persist_empty_tables: bool,
    /// Whether the loader may add indexes supporting upserts
    #[serde(default = "default_true")]
    pub add_upsert_indexes: bool,
    /// SQL executed before the first message is processed
    #[serde(default)]
    pub before_run_sql: Option<String>,
    /// SQL executed after the last message is processed
    #[serde(default)]
    pub after_run_sql: Option<String>,
    /// Connect timeout in seconds; unset keeps the driver behaviour
    #[serde(default)]
    pub connect_timeout: Option<u64>,
    /// Application name reported to PostgreSQL
    #[serde(default = "default_application_name")]
    pub application_name: String,
    /// Records buffered per stream before a flush
    #[serde(default = "default_max_batch_rows")]
    pub max_batch_rows: usize,
    /// Whether STATE messages are echoed to the output
    #[serde(default = "default_true")]
    pub state_support: bool,
    /// Directory for daily-rotated log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Keys not recognized by the harness, kept for collaborators
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_true() -> bool {
    true
}

fn default_application_name() -> String {
    "pgbridge".to_string()
}

fn default_max_batch_rows() -> usize {
    200_000
}

impl TargetConfig {
    /// Create a configuration for `database` with every other key defaulted.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
            sslmode: None,
            sslcert: None,
            sslkey: None,
            sslrootcert: None,
            sslcrl: None,
            schema: default_schema(),
            logging_level: None,
            persist_empty_tables: false,
            add_upsert_indexes: true,
            before_run_sql: None,
            after_run_sql: None,
            connect_timeout: None,
            application_name: default_application_name(),
            max_batch_rows: default_max_batch_rows(),
            state_support: true,
            log_dir: None,
            extra: Map::new(),
        }
    }

    /// Validate values serde cannot check on its own.
    pub fn validate(&self) -> Result<(), String> {
        if self.database.trim().is_empty() {
            return Err("`database` must be a non-empty string".to_string());
        }
        if self.host.is_empty() {
            return Err("`host` must not be empty".to_string());
        }
        if self.port == 0 {
            return Err("`port` must be between 1 and 65535".to_string());
        }
        if self.max_batch_rows == 0 {
            return Err("`max_batch_rows` must be at least 1".to_string());
        }
        if self.sslcert.is_some() != self.sslkey.is_some() {
            return Err("`sslcert` and `sslkey` must be set together".to_string());
        }
        Ok(())
    }

    /// Level used for statement timing logs.
    pub fn timing_level(&self) -> tracing::Level {
        self.logging_level.map(|l| l.tracing_level()).unwrap_or(tracing::Level::DEBUG)
    }

    /// Get the display connection string (without password).
    pub fn display_url(&self) -> String {
        match &self.username {
            Some(user) => {
                format!("postgresql://{}@{}:{}/{}", user, self.host, self.port, self.database)
            }
            None => format!("postgresql://{}:{}/{}", self.host, self.port, self.database),
        }
    }
}
