//! Configuration validation.

use std::time::Duration;

use crate::error::ConfigError;
use crate::schema::{BackendKind, Config};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// First error as a `ConfigError`, if any.
    pub fn into_error(self) -> Option<ConfigError> {
        self.errors.into_iter().next().map(|e| ConfigError::InvalidValue {
            field: e.path,
            message: e.message,
        })
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();
        Self::validate_queue(config, &mut result);
        Self::validate_backend(config, &mut result);
        result
    }

    fn validate_queue(config: &Config, result: &mut ValidationResult) {
        let name = &config.queue.name;
        if name.is_empty() {
            result.add_error(ValidationError::new("queue.name", "name cannot be empty"));
        } else if name.contains(':') {
            result.add_error(ValidationError::new(
                "queue.name",
                format!("'{}' must not contain ':'", name),
            ));
        }

        let secs = config.queue.autoclean_interval_secs;
        if !secs.is_finite() {
            result.add_error(ValidationError::new(
                "queue.autoclean_interval_secs",
                "must be a finite number",
            ));
        } else if secs > 0.0 && Duration::try_from_secs_f64(secs).is_err() {
            result.add_error(ValidationError::new(
                "queue.autoclean_interval_secs",
                format!("{} is out of range", secs),
            ));
        } else if secs <= 0.0 {
            result.add_warning(ValidationWarning::new(
                "queue.autoclean_interval_secs",
                "autoclean disabled, abandoned deliveries stay checked out forever",
            ));
        } else if secs < 1.0 {
            result.add_warning(ValidationWarning::new(
                "queue.autoclean_interval_secs",
                "interval below 1s may redeliver items that are still being processed",
            ));
        }
    }

    fn validate_backend(config: &Config, result: &mut ValidationResult) {
        let backend = &config.backend;
        if backend.poll_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "backend.poll_interval_ms",
                "poll_interval_ms must be greater than 0",
            ));
        }

        if backend.kind == BackendKind::Sqlite && backend.path.as_os_str().is_empty() {
            result.add_error(ValidationError::new("backend.path", "sqlite backend needs a path"));
        }

        if backend.kind == BackendKind::Memory && !backend.options.is_empty() {
            result.add_warning(ValidationWarning::new(
                "backend.options",
                "options are ignored by the memory backend",
            ));
        }
    }
}

impl Config {
    /// Reject configurations the queue cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match ConfigValidator::validate(self).into_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
