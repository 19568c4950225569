//! Configuration validation errors and semantic validation.

use crate::{CatalogConfig, ProbeSettings};
use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

const SHELL_METACHARS: [char; 9] = ['|', '&', ';', '$', '`', '\n', '\r', '<', '>'];

fn check_version(actual: &str) -> ValidationResult<()> {
    if actual != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// Intent action identifiers are dotted names without whitespace.
fn check_action(field: &str, index: usize, action: &str) -> ValidationResult<()> {
    if action.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: format!("{field}[{index}]"),
            message: "action is empty".to_string(),
        });
    }
    if action.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidValue {
            field: format!("{field}[{index}]"),
            message: format!("action contains whitespace: {action:?}"),
        });
    }
    Ok(())
}

/// Validate catalog configuration semantically.
pub fn validate_catalog(catalog: &CatalogConfig) -> ValidationResult<()> {
    check_version(&catalog.schema_version)?;

    for (i, action) in catalog.common_actions.iter().enumerate() {
        check_action("common_actions", i, action)?;
    }

    for (g, group) in catalog.vendor_actions.iter().enumerate() {
        if group.vendor.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("vendor_actions[{g}].vendor"),
                message: "vendor name is empty".to_string(),
            });
        }
        for (i, action) in group.actions.iter().enumerate() {
            check_action(&format!("vendor_actions[{g}].actions"), i, action)?;
        }
    }

    for (i, action) in catalog.excluded_actions.iter().enumerate() {
        check_action("excluded_actions", i, action)?;
    }

    Ok(())
}

/// Validate probe settings semantically.
pub fn validate_probe_settings(settings: &ProbeSettings) -> ValidationResult<()> {
    check_version(&settings.schema_version)?;

    for (field, value) in [("adb_path", &settings.adb_path), ("su_binary", &settings.su_binary)] {
        if value.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: field.to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if value.contains(SHELL_METACHARS) {
            return Err(ValidationError::InvalidValue {
                field: field.to_string(),
                message: format!("contains shell metacharacters: {value:?}"),
            });
        }
    }

    if let Some(serial) = &settings.serial {
        if serial.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "serial".to_string(),
                message: "must be omitted or non-empty".to_string(),
            });
        }
    }

    for (field, argv) in [
        ("process_list_command", &settings.process_list_command),
        ("pid_lookup_command", &settings.pid_lookup_command),
    ] {
        match argv.first() {
            None => {
                return Err(ValidationError::InvalidValue {
                    field: field.to_string(),
                    message: "command must have at least a program name".to_string(),
                })
            }
            Some(program) if program.trim().is_empty() => {
                return Err(ValidationError::InvalidValue {
                    field: field.to_string(),
                    message: "program name is empty".to_string(),
                })
            }
            Some(_) => {}
        }
    }

    if settings.command_timeout_ms == 0 {
        return Err(ValidationError::SemanticError(
            "command_timeout_ms must be positive".to_string(),
        ));
    }

    if settings.max_output_bytes == 0 {
        return Err(ValidationError::SemanticError(
            "max_output_bytes must be positive".to_string(),
        ));
    }

    Ok(())
}
