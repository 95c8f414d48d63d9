use std::net::SocketAddr;

use crate::config::models::{CacheBackend, EngineConfig};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Invalid fee table: {message}")]
    InvalidFeeTable { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Engine configuration validator
pub struct EngineConfigValidator;

impl EngineConfigValidator {
    /// Validate the entire engine configuration, reporting every problem at once
    pub fn validate(config: &EngineConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_duration(&config.cache.ttl, "cache.ttl") {
            errors.push(e);
        }
        if let Err(e) = Self::validate_duration(&config.upstream.timeout, "upstream.timeout") {
            errors.push(e);
        }

        if config.cache.backend == CacheBackend::Redis {
            match config.cache.redis_url.as_deref() {
                None | Some("") => errors.push(ValidationError::MissingField {
                    field: "cache.redis_url".to_string(),
                }),
                Some(url) => {
                    if let Err(e) = Self::validate_redis_url(url) {
                        errors.push(e);
                    }
                }
            }
        }

        let upstream = &config.upstream;
        for (url, field) in [
            (&upstream.geo_ip_url, "upstream.geo_ip_url"),
            (&upstream.reverse_geocode_url, "upstream.reverse_geocode_url"),
            (&upstream.master_data_url, "upstream.master_data_url"),
        ] {
            if let Err(e) = Self::validate_url(url, field) {
                errors.push(e);
            }
        }
        if upstream.user_agent.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: "upstream.user_agent".to_string(),
            });
        }

        if let Some(table) = &config.fee_table {
            errors.extend(
                table
                    .problems()
                    .into_iter()
                    .map(|message| ValidationError::InvalidFeeTable { message }),
            );
        }

        for (user_id, addresses) in &config.address_book {
            if addresses.iter().filter(|a| a.is_default).count() > 1 {
                errors.push(ValidationError::InvalidField {
                    field: format!("address_book.{user_id}"),
                    message: "At most one address may be marked default".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Durations must parse and be non-zero
    fn validate_duration(value: &str, field: &str) -> ValidationResult<()> {
        match humantime::parse_duration(value) {
            Ok(d) if d.is_zero() => Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: "Duration must be greater than zero".to_string(),
            }),
            Ok(_) => Ok(()),
            Err(e) => Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: format!("Invalid duration '{value}': {e}"),
            }),
        }
    }

    fn validate_url(url_str: &str, field: &str) -> ValidationResult<()> {
        match url::Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(ValidationError::InvalidField {
                        field: field.to_string(),
                        message: format!(
                            "URL scheme must be 'http' or 'https', got '{}'",
                            url.scheme()
                        ),
                    });
                }

                if url.host().is_none() {
                    return Err(ValidationError::InvalidField {
                        field: field.to_string(),
                        message: "URL must have a valid host".to_string(),
                    });
                }

                Ok(())
            }
            Err(e) => Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: format!("Invalid URL format: {e}"),
            }),
        }
    }

    fn validate_redis_url(url_str: &str) -> ValidationResult<()> {
        let scheme_ok = url::Url::parse(url_str)
            .map(|url| matches!(url.scheme(), "redis" | "rediss" | "redis+unix" | "unix"))
            .unwrap_or(false);
        if !scheme_ok {
            return Err(ValidationError::InvalidField {
                field: "cache.redis_url".to_string(),
                message: format!("'{url_str}' is not a redis:// or rediss:// URL"),
            });
        }
        Ok(())
    }

    /// Format multiple validation errors into a single message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.len() == 1 {
            return errors[0].to_string();
        }

        let mut message = format!("Found {} validation errors:\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}
