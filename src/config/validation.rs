//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Frontend names unique, backend addresses parse
//! - Every header rule is representable on the wire
//! - No header spelled twice (case-insensitively) in one table
//! - Per-service tables name a service
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{FrontendConfig, ProxyConfig};
use crate::rewrite::delta::{HeaderDelta, InvalidHeader};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("frontend at index {0} has an empty name")]
    EmptyFrontendName(usize),

    #[error("frontend {0:?} is defined more than once")]
    DuplicateFrontend(String),

    #[error("frontend {frontend:?}: invalid backend address {address:?}")]
    InvalidBackend { frontend: String, address: String },

    #[error("frontend {frontend:?}, {table}: {source}")]
    InvalidHeader {
        frontend: String,
        table: String,
        source: InvalidHeader,
    },

    #[error("frontend {frontend:?}, {table}: header {header:?} is declared more than once")]
    DuplicateHeader {
        frontend: String,
        table: String,
        header: String,
    },

    #[error("frontend {0:?}: custom_service_headers has a table with an empty service name")]
    EmptyServiceName(String),

    #[error("invalid listener address {0:?}")]
    InvalidListener(String),

    #[error("service mapping for {0:?} has an empty hostname or service name")]
    InvalidServiceMapping(String),

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidListener(
            config.listener.bind_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    let mut names = HashSet::new();
    for (index, frontend) in config.frontends.iter().enumerate() {
        if frontend.name.is_empty() {
            errors.push(ValidationError::EmptyFrontendName(index));
        } else if !names.insert(frontend.name.as_str()) {
            errors.push(ValidationError::DuplicateFrontend(frontend.name.clone()));
        }

        if frontend.backend.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidBackend {
                frontend: frontend.name.clone(),
                address: frontend.backend.clone(),
            });
        }

        validate_headers(frontend, &mut errors);
    }

    for (host, service) in &config.service_mapping {
        if host.trim().is_empty() || service.trim().is_empty() {
            errors.push(ValidationError::InvalidServiceMapping(host.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_headers(frontend: &FrontendConfig, errors: &mut Vec<ValidationError>) {
    let Some(headers) = &frontend.headers else {
        return;
    };

    let mut tables = vec![
        (
            "custom_request_headers".to_string(),
            &headers.custom_request_headers,
        ),
        (
            "custom_response_headers".to_string(),
            &headers.custom_response_headers,
        ),
    ];
    for (service, table) in &headers.custom_service_headers {
        if service.trim().is_empty() {
            errors.push(ValidationError::EmptyServiceName(frontend.name.clone()));
        }
        tables.push((format!("custom_service_headers.{service}"), table));
    }

    for (table_name, table) in tables {
        if let Err(source) = HeaderDelta::try_from_map(table) {
            errors.push(ValidationError::InvalidHeader {
                frontend: frontend.name.clone(),
                table: table_name.clone(),
                source,
            });
        }

        for header in duplicate_names(table) {
            errors.push(ValidationError::DuplicateHeader {
                frontend: frontend.name.clone(),
                table: table_name.clone(),
                header,
            });
        }
    }
}

/// Names that appear more than once when compared case-insensitively.
fn duplicate_names(table: &BTreeMap<String, String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for name in table.keys() {
        let lower = name.to_ascii_lowercase();
        if !seen.insert(lower.clone()) && !duplicates.contains(&lower) {
            duplicates.push(lower);
        }
    }
    duplicates
}
