//! Configuration validation

use crate::config::SWITCH_BUTTONS;
use crate::schema::RawConfig;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("System '{system}': {message}")]
    SystemError { system: String, message: String },

    #[error("{field} must be greater than zero")]
    ZeroInterval { field: &'static str },

    #[error("Invalid switch combo: {0}")]
    InvalidCombo(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (system, settings) in &config.systems {
        if system.is_empty() {
            errors.push(ValidationError::SystemError {
                system: system.clone(),
                message: "system name cannot be empty".into(),
            });
        }
        if settings.launcher.as_os_str().is_empty() {
            errors.push(ValidationError::SystemError {
                system: system.clone(),
                message: "launcher cannot be empty".into(),
            });
        }
    }

    if config.session.wait_poll_ms == Some(0) {
        errors.push(ValidationError::ZeroInterval {
            field: "session.wait_poll_ms",
        });
    }

    if config.accounting.poll_interval_secs == Some(0) {
        errors.push(ValidationError::ZeroInterval {
            field: "accounting.poll_interval_secs",
        });
    }

    if let Some(combo) = &config.input.combo {
        if combo.len() != 2 {
            errors.push(ValidationError::InvalidCombo(format!(
                "expected 2 buttons, got {}",
                combo.len()
            )));
        } else if combo.iter().collect::<HashSet<_>>().len() != 2 {
            errors.push(ValidationError::InvalidCombo(
                "the two buttons must differ".into(),
            ));
        }
        for name in combo {
            if !SWITCH_BUTTONS.contains(&name.as_str()) {
                errors.push(ValidationError::InvalidCombo(format!(
                    "unknown button '{}'",
                    name
                )));
            }
        }
    }

    errors
}
