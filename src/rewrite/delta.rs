//! Header deltas: compiled set/delete rules for one header collection.
//!
//! A configured value of `""` deletes the header, anything else overwrites it.

use std::collections::BTreeMap;
use std::fmt;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

use crate::observability::metrics;

/// A configured header that cannot be represented on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidHeader {
    #[error("invalid header name {0:?}")]
    Name(String),

    #[error("invalid value for header {0:?}")]
    Value(String),
}

/// Which side of the exchange a delta is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Request => "request",
            Direction::Response => "response",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation applied to a single header name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaOp {
    /// Replace all existing values with this one.
    Set(HeaderValue),
    /// Remove every value.
    Remove,
}

impl DeltaOp {
    fn label(&self) -> &'static str {
        match self {
            DeltaOp::Set(_) => "set",
            DeltaOp::Remove => "remove",
        }
    }
}

/// Ordered set/delete rules keyed by (case-insensitive) header name.
///
/// Names are unique; compiling a map that spells the same name twice keeps
/// the last spelling in map order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderDelta {
    entries: Vec<(HeaderName, DeltaOp)>,
}

impl HeaderDelta {
    /// Parse one configured `name = value` pair.
    pub fn parse_entry(name: &str, value: &str) -> Result<(HeaderName, DeltaOp), InvalidHeader> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| InvalidHeader::Name(name.to_string()))?;

        let op = if value.is_empty() {
            DeltaOp::Remove
        } else {
            let header_value =
                HeaderValue::from_str(value).map_err(|_| InvalidHeader::Value(name.to_string()))?;
            DeltaOp::Set(header_value)
        };

        Ok((header_name, op))
    }

    /// Compile a configured table, failing on the first invalid entry.
    pub fn try_from_map(map: &BTreeMap<String, String>) -> Result<Self, InvalidHeader> {
        let mut delta = Self::default();
        for (name, value) in map {
            let (name, op) = Self::parse_entry(name, value)?;
            delta.push(name, op);
        }
        Ok(delta)
    }

    /// Compile a configured table, skipping entries that do not parse.
    ///
    /// Configurations read from disk are validated before they get here, so
    /// skipped entries only come from hand-built configs.
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        let mut delta = Self::default();
        for (name, value) in map {
            match Self::parse_entry(name, value) {
                Ok((name, op)) => delta.push(name, op),
                Err(e) => tracing::warn!(error = %e, "Skipping invalid header rule"),
            }
        }
        delta
    }

    fn push(&mut self, name: HeaderName, op: DeltaOp) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = op,
            None => self.entries.push((name, op)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(HeaderName, DeltaOp)> {
        self.entries.iter()
    }

    /// Apply every rule to `headers`.
    pub fn apply(&self, headers: &mut HeaderMap, direction: Direction) {
        for (name, op) in &self.entries {
            match op {
                DeltaOp::Set(value) => {
                    tracing::debug!(%direction, header = %name, value = ?value, "Setting header");
                    headers.insert(name.clone(), value.clone());
                }
                DeltaOp::Remove => {
                    tracing::debug!(%direction, header = %name, "Deleting header");
                    headers.remove(name);
                }
            }
            metrics::record_header_mutation(direction.as_str(), op.label());
        }
    }
}
