//! Error types for the pgbridge harness.
//!
//! Every failure an invocation can hit maps to one variant here. Normal mode
//! propagates these to the process boundary; test mode folds them into a
//! [`ProbeResult`](crate::models::ProbeResult).

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pgbridge.
#[derive(Debug, Error)]
pub enum TargetError {
    /// Configuration file does not exist.
    #[error("Config file not found: {}", path.display())]
    ConfigNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Configuration file is not a valid JSON object.
    #[error("Config parse error: {message}")]
    ConfigParse {
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration is missing a required key or has a mistyped value.
    #[error("Config validation error: {message}")]
    ConfigValidation {
        /// Human-readable error message.
        message: String,
    },

    /// An `--input` or `--output` path could not be opened.
    #[error("Failed to open {}: {source}", path.display())]
    IoOpen {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Database connection failed (network, authentication or TLS).
    #[error("Connection error: {message}")]
    Connection {
        /// Driver message.
        message: String,
        /// Actionable hint for the operator.
        hint: Option<String>,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Statement execution error with PostgreSQL-specific details.
    #[error("{message}")]
    Query {
        /// PostgreSQL error message.
        message: String,
        /// Additional detail from PostgreSQL.
        detail: Option<String>,
        /// PostgreSQL hint.
        hint: Option<String>,
        /// SQLSTATE code (e.g., "42P01").
        code: Option<String>,
    },

    /// Loader could not be constructed from the configuration.
    #[error("Loader config error: {message}")]
    LoaderConfig {
        /// Human-readable error message.
        message: String,
    },

    /// Raised inside the stream-processing collaborator.
    #[error("Delegation error: {message}")]
    Delegation {
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Unexpected internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
    },
}

impl TargetError {
    // ========== Constructors ==========

    /// Create a config-not-found error.
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create a config parse error with source.
    pub fn config_parse(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConfigParse { message: message.into(), source: Some(Box::new(source)) }
    }

    /// Create a config validation error.
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation { message: message.into() }
    }

    /// Create an I/O open error for a redirect path.
    pub fn io_open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoOpen { path: path.into(), source }
    }

    /// Create a new connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), hint: None, source: None }
    }

    /// Create a connection error with a custom hint.
    pub fn connection_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), hint: Some(hint.into()), source: None }
    }

    /// Create a TLS negotiation or setup error.
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            hint: Some("Verify sslmode and the sslcert/sslkey/sslrootcert files".to_string()),
            source: None,
        }
    }

    /// Create a loader configuration error.
    pub fn loader_config(message: impl Into<String>) -> Self {
        Self::LoaderConfig { message: message.into() }
    }

    /// Create a delegation error.
    pub fn delegation(message: impl Into<String>) -> Self {
        Self::Delegation { message: message.into(), source: None }
    }

    /// Create a delegation error with source.
    pub fn delegation_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Delegation { message: message.into(), source: Some(Box::new(source)) }
    }

    /// Create a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    // ========== Methods ==========

    /// Get the error category name.
    pub fn category(&self) -> &'static str {
        match self {
            Self::ConfigNotFound { .. } => "ConfigNotFound",
            Self::ConfigParse { .. } => "ConfigParse",
            Self::ConfigValidation { .. } => "ConfigValidation",
            Self::IoOpen { .. } => "IoOpen",
            Self::Connection { .. } => "Connection",
            Self::Query { .. } => "Query",
            Self::LoaderConfig { .. } => "LoaderConfig",
            Self::Delegation { .. } => "Delegation",
            Self::Internal { .. } => "Internal",
        }
    }

    /// Get actionable hint for the operator.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::ConfigNotFound { .. } => Some("Check the --config path"),
            Self::ConfigParse { .. } => Some("The config file must contain a JSON object"),
            Self::ConfigValidation { .. } => None,
            Self::IoOpen { .. } => Some("Check the --input/--output paths and permissions"),
            Self::Connection { hint, .. } => {
                hint.as_deref().or(Some("Check that the database server is running"))
            }
            Self::Query { hint, .. } => hint.as_deref(),
            Self::LoaderConfig { .. } => Some("Check the `schema` config key"),
            Self::Delegation { .. } => None,
            Self::Internal { .. } => Some("Please report this issue"),
        }
    }

    /// Get the SQLSTATE code (if applicable).
    pub fn pg_code(&self) -> Option<&str> {
        match self {
            Self::Query { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Check if this error happened before any connection was attempted.
    pub fn is_pre_connection(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. }
                | Self::ConfigParse { .. }
                | Self::ConfigValidation { .. }
                | Self::IoOpen { .. }
        )
    }

    /// First line of the display text.
    pub fn summary(&self) -> String {
        let text = self.to_string();
        text.lines().next().unwrap_or_default().trim_end().to_string()
    }
}

// ========== Error Conversions ==========

/// Convert from tokio_postgres::Error to TargetError.
impl From<tokio_postgres::Error> for TargetError {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let message = db_err.message().to_string();
            let code_str = db_err.code().code();

            match code_str {
                "28P01" => {
                    return TargetError::Connection {
                        message,
                        hint: Some(
                            "Invalid password - check `username` and `password`".to_string(),
                        ),
                        source: None,
                    }
                }
                _ if code_str.starts_with("28") => {
                    return TargetError::Connection {
                        message,
                        hint: Some(
                            "Authentication failed - check username and pg_hba.conf".to_string(),
                        ),
                        source: None,
                    }
                }
                // Connection exceptions (08xxx)
                _ if code_str.starts_with("08") => {
                    return TargetError::Connection {
                        message,
                        hint: None,
                        source: Some(Box::new(err)),
                    }
                }
                _ => {
                    return TargetError::Query {
                        message,
                        detail: db_err.detail().map(String::from),
                        hint: db_err.hint().map(String::from),
                        code: Some(code_str.to_string()),
                    }
                }
            }
        }

        if err.is_closed() {
            return TargetError::Connection {
                message: "Connection closed".to_string(),
                hint: None,
                source: Some(Box::new(err)),
            };
        }

        TargetError::Connection {
            message: err.to_string(),
            hint: None,
            source: Some(Box::new(err)),
        }
    }
}

/// Convert from native_tls::Error to TargetError.
impl From<native_tls::Error> for TargetError {
    fn from(err: native_tls::Error) -> Self {
        TargetError::Connection {
            message: format!("TLS setup failed: {err}"),
            hint: Some("Verify sslmode and the sslcert/sslkey/sslrootcert files".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

/// Convert from serde_json::Error to TargetError.
///
/// Only the stream engine serializes after startup, so a JSON failure at this
/// point belongs to delegation.
impl From<serde_json::Error> for TargetError {
    fn from(err: serde_json::Error) -> Self {
        TargetError::delegation_with_source(format!("JSON error: {err}"), err)
    }
}
