use crate::{
    adapters::dataplane_client::Endpoint,
    config::models::{DataplaneConfig, LoggingConfig, ManagerConfig, RetryConfig},
    core::naming::is_standard_port,
};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Manager configuration validator
pub struct ManagerConfigValidator;

impl ManagerConfigValidator {
    /// Validate the entire manager configuration, collecting every problem found
    pub fn validate(config: &ManagerConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        errors.extend(Self::validate_dataplane(&config.dataplane));

        if config.frontend.max_connections == 0 {
            errors.push(ValidationError::InvalidField {
                field: "frontend.max_connections".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.frontend.default_backend.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: "frontend.default_backend".to_string(),
            });
        }
        if config.backend.resolver.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: "backend.resolver".to_string(),
            });
        }

        errors.extend(Self::validate_restricted_ports(&config.restricted_ports));

        if let Err(e) = Self::validate_retry(&config.retry) {
            errors.push(e);
        }
        if let Err(e) = Self::validate_logging(&config.logging) {
            errors.push(e);
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::ValidationFailed {
                message: errors
                    .iter()
                    .map(|e| format!("  - {e}"))
                    .collect::<Vec<_>>()
                    .join("\n"),
            }),
        }
    }

    fn validate_dataplane(dataplane: &DataplaneConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if let Err(e) = dataplane.endpoint.parse::<Endpoint>() {
            errors.push(ValidationError::InvalidEndpoint {
                endpoint: dataplane.endpoint.clone(),
                reason: e.to_string(),
            });
        }
        if dataplane.username.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "dataplane.username".to_string(),
            });
        }
        if dataplane.password.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "dataplane.password".to_string(),
            });
        }
        if !dataplane.base_path.is_empty() && !dataplane.base_path.starts_with('/') {
            errors.push(ValidationError::InvalidField {
                field: "dataplane.base_path".to_string(),
                message: "must start with '/'".to_string(),
            });
        }
        if dataplane.timeout_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "dataplane.timeout_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        errors
    }

    fn validate_restricted_ports(ports: &[u16]) -> Vec<ValidationError> {
        ports
            .iter()
            .filter_map(|&port| {
                if port == 0 {
                    Some(ValidationError::InvalidField {
                        field: "restricted_ports".to_string(),
                        message: "port 0 is not a valid port".to_string(),
                    })
                } else if is_standard_port(port) {
                    Some(ValidationError::InvalidField {
                        field: "restricted_ports".to_string(),
                        message: format!("port {port} is always managed and cannot be restricted"),
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    fn validate_retry(retry: &RetryConfig) -> ValidationResult<()> {
        if retry.attempts == 0 {
            return Err(ValidationError::InvalidField {
                field: "retry.attempts".to_string(),
                message: "at least one attempt is required".to_string(),
            });
        }
        Ok(())
    }

    fn validate_logging(logging: &LoggingConfig) -> ValidationResult<()> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&logging.level.to_ascii_lowercase().as_str()) {
            return Err(ValidationError::InvalidField {
                field: "logging.level".to_string(),
                message: format!("unknown level '{}'", logging.level),
            });
        }
        Ok(())
    }
}
