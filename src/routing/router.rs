//! Frontend lookup.
//!
//! # Design Decisions
//! - Immutable after construction; a reload builds a new Router
//! - Each frontend carries its own header rewriter (or none)
//! - First match wins, ordered by priority

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::Request;

use crate::config::schema::FrontendConfig;
use crate::rewrite::HeaderRewriter;
use crate::routing::matcher::Matcher;
use crate::service_map::ServiceLookup;

/// A compiled frontend.
#[derive(Debug, Clone)]
pub struct Frontend {
    pub name: String,
    pub matcher: Matcher,
    pub backend: SocketAddr,
    pub priority: u32,
    /// Absent when the frontend declares no header rules.
    pub rewriter: Option<HeaderRewriter>,
}

/// Priority-ordered set of frontends.
#[derive(Debug, Default)]
pub struct Router {
    frontends: Vec<Frontend>,
}

impl Router {
    /// Compile frontends from configuration.
    ///
    /// Frontends with an unparsable backend address are skipped.
    pub fn from_config(configs: &[FrontendConfig], service_map: Arc<dyn ServiceLookup>) -> Self {
        let mut frontends: Vec<Frontend> = configs
            .iter()
            .filter_map(|config| {
                let backend = match config.backend.parse() {
                    Ok(addr) => addr,
                    Err(_) => {
                        tracing::warn!(
                            frontend = %config.name,
                            backend = %config.backend,
                            "Invalid backend address, skipping frontend"
                        );
                        return None;
                    }
                };

                let rewriter =
                    HeaderRewriter::from_config(config.headers.as_ref(), service_map.clone());
                tracing::debug!(
                    frontend = %config.name,
                    header_rewrite = rewriter.is_some(),
                    "Compiled frontend"
                );

                Some(Frontend {
                    name: config.name.clone(),
                    matcher: Matcher::for_frontend(
                        config.host.as_deref(),
                        config.path_prefix.as_deref(),
                    ),
                    backend,
                    priority: config.priority,
                    rewriter,
                })
            })
            .collect();

        // Stable sort keeps config order among equal priorities.
        frontends.sort_by(|a, b| b.priority.cmp(&a.priority));

        Self { frontends }
    }

    /// Find the frontend serving `req`.
    pub fn match_request<B>(&self, req: &Request<B>) -> Option<&Frontend> {
        self.frontends.iter().find(|f| f.matcher.matches(req))
    }

    pub fn frontends(&self) -> &[Frontend] {
        &self.frontends
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::HeadersConfig;
    use crate::service_map::CowServiceMap;

    fn frontend(name: &str, host: Option<&str>, prefix: Option<&str>, priority: u32) -> FrontendConfig {
        FrontendConfig {
            name: name.into(),
            host: host.map(Into::into),
            path_prefix: prefix.map(Into::into),
            backend: "127.0.0.1:3000".into(),
            priority,
            headers: None,
        }
    }

    #[test]
    fn test_priority_order() {
        let configs = vec![
            frontend("catch-all", None, Some("/"), 0),
            frontend("api", None, Some("/api"), 10),
        ];
        let router = Router::from_config(&configs, Arc::new(CowServiceMap::new()));

        let api = Request::builder().uri("/api/users").body(()).unwrap();
        assert_eq!(router.match_request(&api).unwrap().name, "api");

        let other = Request::builder().uri("/static/app.js").body(()).unwrap();
        assert_eq!(router.match_request(&other).unwrap().name, "catch-all");
    }

    #[test]
    fn test_no_match() {
        let configs = vec![frontend("api", Some("api.example.com"), None, 0)];
        let router = Router::from_config(&configs, Arc::new(CowServiceMap::new()));

        let req = Request::builder()
            .uri("/")
            .header("Host", "www.example.com")
            .body(())
            .unwrap();
        assert!(router.match_request(&req).is_none());
    }

    #[test]
    fn test_rewriter_only_for_configured_frontends() {
        let mut with_headers = frontend("with", None, Some("/with"), 0);
        let mut headers = HeadersConfig::default();
        headers
            .custom_response_headers
            .insert("X-Frontend".into(), "with".into());
        with_headers.headers = Some(headers);

        let mut bad_backend = frontend("bad", None, None, 0);
        bad_backend.backend = "nowhere".into();

        let configs = vec![with_headers, frontend("without", None, Some("/without"), 0), bad_backend];
        let router = Router::from_config(&configs, Arc::new(CowServiceMap::new()));

        assert_eq!(router.frontends().len(), 2);
        assert!(router.frontends()[0].rewriter.is_some());
        assert!(router.frontends()[1].rewriter.is_none());
    }
}
