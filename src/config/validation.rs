//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check route structure (unique ids, at least one predicate)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Shorthand routes are not checked here; a bad one is skipped at load time

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// One semantic problem, located by its dotted config path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }
    if config.admin.enabled {
        check_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.trim().is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must not be empty"));
        }
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.connect_secs", timeouts.connect_secs),
        ("timeouts.response_secs", timeouts.response_secs),
        ("timeouts.request_secs", timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    if config.rate_limiter.default_replenish_rate == 0 {
        errors.push(ValidationError::new(
            "rate_limiter.default_replenish_rate",
            "must be greater than 0",
        ));
    }
    if config.rate_limiter.default_burst_capacity == 0 {
        errors.push(ValidationError::new(
            "rate_limiter.default_burst_capacity",
            "must be greater than 0",
        ));
    }

    let mut seen = HashSet::new();
    for (i, route) in config.gateway.routes.iter().enumerate() {
        let field = format!("gateway.routes[{}]", i);
        if !seen.insert(route.id.as_str()) {
            errors.push(ValidationError::new(
                field.clone(),
                format!("duplicate route id '{}'", route.id),
            ));
        }
        if let Err(e) = route.validate() {
            errors.push(ValidationError::new(field, e.to_string()));
        }
    }

    for (service, instances) in &config.discovery.services {
        for instance in instances {
            if instance.parse::<SocketAddr>().is_err() {
                errors.push(ValidationError::new(
                    format!("discovery.services.{}", service),
                    format!("invalid instance address '{}'", instance),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_addr(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            field,
            format!("invalid socket address '{}'", value),
        ));
    }
}
