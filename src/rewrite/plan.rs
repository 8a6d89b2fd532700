//! Rewrite plan compilation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::schema::HeadersConfig;
use crate::rewrite::delta::HeaderDelta;
use crate::service_map::ServiceLookup;

/// Immutable header rules of one frontend.
///
/// Built once per config (re)load and shared by every request on the
/// frontend. A reload builds a new plan instead of mutating this one.
pub struct RewritePlan {
    request: HeaderDelta,
    response: HeaderDelta,
    services: HashMap<String, HeaderDelta>,
    service_map: Arc<dyn ServiceLookup>,
}

impl RewritePlan {
    /// Compile a frontend's header rules.
    ///
    /// Returns `None` when no rule survives compilation so the caller can
    /// skip the stage entirely. Tables keyed by an empty service name are
    /// dropped: no hostname resolves to them.
    pub fn build(
        headers: Option<&HeadersConfig>,
        service_map: Arc<dyn ServiceLookup>,
    ) -> Option<Self> {
        let headers = headers?;
        if headers.is_empty() {
            return None;
        }

        let request = HeaderDelta::from_map(&headers.custom_request_headers);
        let response = HeaderDelta::from_map(&headers.custom_response_headers);
        let services: HashMap<_, _> = headers
            .custom_service_headers
            .iter()
            .filter(|(service, _)| !service.is_empty())
            .map(|(service, table)| (service.clone(), HeaderDelta::from_map(table)))
            .filter(|(_, delta)| !delta.is_empty())
            .collect();

        if request.is_empty() && response.is_empty() && services.is_empty() {
            return None;
        }

        Some(Self {
            request,
            response,
            services,
            service_map,
        })
    }

    /// Applied to every request.
    pub fn request_delta(&self) -> &HeaderDelta {
        &self.request
    }

    /// Applied to every response.
    pub fn response_delta(&self) -> &HeaderDelta {
        &self.response
    }

    /// Request rules for `service`, if any.
    pub fn service_delta(&self, service: &str) -> Option<&HeaderDelta> {
        self.services.get(service)
    }

    pub fn service_map(&self) -> &dyn ServiceLookup {
        self.service_map.as_ref()
    }
}

impl fmt::Debug for RewritePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RewritePlan")
            .field("request", &self.request)
            .field("response", &self.response)
            .field("services", &self.services)
            .finish_non_exhaustive()
    }
}
