//! Configuration loading.
//!
//! Reads the `--config` document, checks required keys and converts it into a
//! [`TargetConfig`]. Nothing downstream runs until this succeeds.

use crate::error::TargetError;
use crate::models::{TargetConfig, REQUIRED_CONFIG_KEYS};

use serde_json::Value;
use std::path::Path;

/// Load and validate the configuration at `path`.
///
/// # Errors
/// * `ConfigNotFound` if the file does not exist
/// * `ConfigParse` if it is not a JSON object
/// * `ConfigValidation` if a required key is missing or a value is invalid
pub fn load_config(path: &Path) -> Result<TargetConfig, TargetError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TargetError::config_not_found(path));
        }
        Err(e) => {
            return Err(TargetError::config_parse(
                format!("failed to read {}: {e}", path.display()),
                e,
            ));
        }
    };

    let config = parse_config(&contents)?;
    tracing::debug!(
        path = %path.display(),
        target = %config.display_url(),
        schema = %config.schema,
        "Config loaded"
    );
    Ok(config)
}

/// Parse and validate a configuration document.
pub fn parse_config(contents: &str) -> Result<TargetConfig, TargetError> {
    let document: Value = serde_json::from_str(contents)
        .map_err(|e| TargetError::config_parse(format!("invalid JSON: {e}"), e))?;

    let Value::Object(map) = &document else {
        return Err(TargetError::ConfigParse {
            message: "top-level value must be a JSON object".to_string(),
            source: None,
        });
    };

    let missing: Vec<&str> = REQUIRED_CONFIG_KEYS
        .iter()
        .copied()
        .filter(|key| map.get(*key).map_or(true, Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(TargetError::config_validation(format!(
            "Config is missing required keys: {missing:?}"
        )));
    }

    let config: TargetConfig = serde_json::from_value(document)
        .map_err(|e| TargetError::config_validation(e.to_string()))?;
    config.validate().map_err(TargetError::config_validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, TargetError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let file = write_config("{\"database\": ");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, TargetError::ConfigParse { .. }));
    }

    #[test]
    fn test_non_object_is_parse_error() {
        let file = write_config("[\"database\"]");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, TargetError::ConfigParse { .. }));
    }

    #[test]
    fn test_missing_database_is_validation_error() {
        let file = write_config(r#"{"host": "db.internal", "port": 5432}"#);
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, TargetError::ConfigValidation { .. }));
        assert!(err.to_string().contains("database"));
    }

    #[test]
    fn test_null_database_is_validation_error() {
        let err = parse_config(r#"{"database": null}"#).unwrap_err();
        assert!(matches!(err, TargetError::ConfigValidation { .. }));
    }

    #[test]
    fn test_empty_database_is_validation_error() {
        let err = parse_config(r#"{"database": ""}"#).unwrap_err();
        assert!(matches!(err, TargetError::ConfigValidation { .. }));
    }

    #[test]
    fn test_mistyped_value_is_validation_error() {
        let err = parse_config(r#"{"database": "warehouse", "port": "not-a-port"}"#).unwrap_err();
        assert!(matches!(err, TargetError::ConfigValidation { .. }));
    }

    #[test]
    fn test_valid_config_loads() {
        let file = write_config(
            r#"{"database": "warehouse", "username": "loader", "before_run_sql": "SET search_path TO raw"}"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.database, "warehouse");
        assert_eq!(config.username.as_deref(), Some("loader"));
        assert_eq!(config.before_run_sql.as_deref(), Some("SET search_path TO raw"));
        assert_eq!(config.host, "localhost");
    }
}
