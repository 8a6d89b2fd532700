//! Header rewrite engine.
//!
//! Request path, in this order:
//! 1. global request rules
//! 2. resolve the request hostname to a service
//! 3. pick that service's rules (none for unknown hosts)
//! 4. apply them, so they win over step 1
//!
//! The response path only applies the global response rules.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tower::{Service, ServiceExt};

use crate::config::schema::HeadersConfig;
use crate::rewrite::delta::Direction;
use crate::rewrite::plan::RewritePlan;
use crate::service_map::ServiceLookup;

/// Failure while rewriting response headers.
///
/// No rule can currently fail; callers still handle the `Err` arm.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RewriteError {
    #[error("response cannot be rewritten: {0}")]
    InvalidResponse(String),
}

/// Applies a frontend's [`RewritePlan`] to requests and responses.
#[derive(Debug, Clone)]
pub struct HeaderRewriter {
    plan: Arc<RewritePlan>,
}

impl HeaderRewriter {
    pub fn new(plan: RewritePlan) -> Self {
        Self {
            plan: Arc::new(plan),
        }
    }

    /// Build a rewriter for a frontend, or `None` if it declares no header rules.
    pub fn from_config(
        headers: Option<&HeadersConfig>,
        service_map: Arc<dyn ServiceLookup>,
    ) -> Option<Self> {
        RewritePlan::build(headers, service_map).map(Self::new)
    }

    pub fn plan(&self) -> &RewritePlan {
        &self.plan
    }

    /// Set or delete request headers.
    pub fn modify_request_headers<B>(&self, req: &mut Request<B>) {
        // The target host is read before any rule can touch the Host header.
        let hostname = request_hostname(req).to_string();

        self.plan
            .request_delta()
            .apply(req.headers_mut(), Direction::Request);

        let service_map = self.plan.service_map();
        tracing::trace!(entries = service_map.len(), "Hostname service mapping");
        let service = service_map.get(&hostname).unwrap_or_default();
        tracing::info!(
            service = %service,
            hostname = %hostname,
            uri = %req.uri(),
            "Resolved request service"
        );

        // Unmapped hosts have no service rules, whatever the tables are keyed by.
        if service.is_empty() {
            return;
        }
        if let Some(delta) = self.plan.service_delta(&service) {
            delta.apply(req.headers_mut(), Direction::Request);
        }
    }

    /// Set or delete response headers.
    pub fn modify_response_headers<B>(&self, res: &mut Response<B>) -> Result<(), RewriteError> {
        self.plan
            .response_delta()
            .apply(res.headers_mut(), Direction::Response);
        Ok(())
    }

    /// Rewrite the request, then hand it to `next`.
    ///
    /// Without a continuation this stage terminates the chain with an empty
    /// `200 OK`. Response rules are not applied here; the component that
    /// owns the outbound response calls [`Self::modify_response_headers`].
    pub async fn invoke<S>(&self, mut req: Request<Body>, next: Option<S>) -> Result<Response, S::Error>
    where
        S: Service<Request<Body>, Response = Response>,
    {
        self.modify_request_headers(&mut req);

        match next {
            Some(mut next) => next.ready().await?.call(req).await,
            None => Ok(StatusCode::OK.into_response()),
        }
    }
}

/// Host of the request target: the URI authority, else the `Host` header.
fn request_hostname<B>(req: &Request<B>) -> &str {
    req.uri()
        .host()
        .or_else(|| {
            req.headers()
                .get(header::HOST)
                .and_then(|h| h.to_str().ok())
        })
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service_map::CowServiceMap;
    use axum::http::HeaderValue;
    use axum::routing::Route;
    use std::collections::BTreeMap;
    use std::convert::Infallible;

    fn table(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn scenario_rewriter() -> HeaderRewriter {
        let map = Arc::new(CowServiceMap::from_entries([("a.example.com", "svcA")]));
        let mut headers = HeadersConfig {
            custom_request_headers: table(&[("X-Env", "prod")]),
            custom_response_headers: table(&[("X-Served-By", "edge"), ("Server", "")]),
            ..Default::default()
        };
        headers
            .custom_service_headers
            .insert("svcA".into(), table(&[("X-Env", "staging"), ("X-Debug", "1")]));
        HeaderRewriter::from_config(Some(&headers), map).unwrap()
    }

    fn request_to(host: &str) -> Request<Body> {
        Request::builder()
            .uri("/index.html")
            .header(header::HOST, host)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_service_rules_override_global_rules() {
        let rewriter = scenario_rewriter();

        let mut req = request_to("a.example.com");
        rewriter.modify_request_headers(&mut req);
        assert_eq!(req.headers().get("x-env").unwrap(), "staging");
        assert_eq!(req.headers().get("x-debug").unwrap(), "1");
    }

    #[test]
    fn test_unknown_host_gets_global_rules_only() {
        let rewriter = scenario_rewriter();

        let mut req = request_to("b.example.com");
        rewriter.modify_request_headers(&mut req);
        assert_eq!(req.headers().get("x-env").unwrap(), "prod");
        assert!(req.headers().get("x-debug").is_none());

        let mut req = Request::builder()
            .uri("/no-host")
            .body(Body::empty())
            .unwrap();
        rewriter.modify_request_headers(&mut req);
        assert_eq!(req.headers().get("x-env").unwrap(), "prod");
        assert!(req.headers().get("x-debug").is_none());
    }

    #[test]
    fn test_empty_service_key_never_matches_unmapped_host() {
        let map = Arc::new(CowServiceMap::from_entries([("a.example.com", "svcA")]));
        let mut headers = HeadersConfig {
            custom_request_headers: table(&[("X-Env", "prod")]),
            ..Default::default()
        };
        headers
            .custom_service_headers
            .insert(String::new(), table(&[("X-Debug", "1")]));
        let rewriter = HeaderRewriter::from_config(Some(&headers), map).unwrap();

        let mut req = request_to("unmapped.example.com");
        rewriter.modify_request_headers(&mut req);
        assert_eq!(req.headers().get("x-env").unwrap(), "prod");
        assert!(req.headers().get("x-debug").is_none());
    }

    #[test]
    fn test_uri_authority_wins_over_host_header() {
        let rewriter = scenario_rewriter();

        let mut req = Request::builder()
            .uri("http://a.example.com:8080/")
            .header(header::HOST, "b.example.com")
            .body(Body::empty())
            .unwrap();
        rewriter.modify_request_headers(&mut req);
        assert_eq!(req.headers().get("x-debug").unwrap(), "1");
    }

    #[test]
    fn test_empty_service_value_deletes_globally_set_header() {
        let map = Arc::new(CowServiceMap::from_entries([("a.example.com", "svcA")]));
        let mut headers = HeadersConfig {
            custom_request_headers: table(&[("X-Env", "prod")]),
            ..Default::default()
        };
        headers
            .custom_service_headers
            .insert("svcA".into(), table(&[("X-Env", "")]));
        let rewriter = HeaderRewriter::from_config(Some(&headers), map).unwrap();

        let mut req = request_to("a.example.com");
        req.headers_mut()
            .insert("x-env", HeaderValue::from_static("client"));
        rewriter.modify_request_headers(&mut req);
        assert!(req.headers().get("x-env").is_none());
    }

    #[test]
    fn test_service_resolution_follows_live_map() {
        let map = Arc::new(CowServiceMap::new());
        let mut headers = HeadersConfig::default();
        headers
            .custom_service_headers
            .insert("svcA".into(), table(&[("X-Debug", "1")]));
        let rewriter = HeaderRewriter::from_config(Some(&headers), map.clone()).unwrap();

        let mut req = request_to("a.example.com");
        rewriter.modify_request_headers(&mut req);
        assert!(req.headers().get("x-debug").is_none());

        map.insert("a.example.com", "svcA");
        let mut req = request_to("a.example.com");
        rewriter.modify_request_headers(&mut req);
        assert_eq!(req.headers().get("x-debug").unwrap(), "1");
    }

    #[test]
    fn test_response_rules_are_global_only() {
        let rewriter = scenario_rewriter();

        let mut res = Response::builder()
            .header("server", "backend/1.0")
            .header("x-env", "backend")
            .body(Body::empty())
            .unwrap();

        let result = rewriter.modify_response_headers(&mut res);
        assert!(result.is_ok());
        assert_eq!(res.headers().get("x-served-by").unwrap(), "edge");
        assert!(res.headers().get("server").is_none());
        // Request rules never leak into the response.
        assert_eq!(res.headers().get("x-env").unwrap(), "backend");
        assert!(res.headers().get("x-debug").is_none());
    }

    #[test]
    fn test_request_rewrite_leaves_response_alone() {
        let rewriter = scenario_rewriter();

        let mut req = request_to("a.example.com");
        rewriter.modify_request_headers(&mut req);
        assert!(req.headers().get("x-served-by").is_none());
    }

    #[tokio::test]
    async fn test_invoke_calls_continuation_with_rewritten_request() {
        let rewriter = scenario_rewriter();
        let next = tower::service_fn(|req: Request<Body>| async move {
            let env = req.headers().get("x-env").cloned().unwrap();
            Ok::<_, Infallible>(Response::new(Body::from(env.as_bytes().to_vec())))
        });

        let res = rewriter
            .invoke(request_to("a.example.com"), Some(next))
            .await
            .unwrap();

        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"staging");
    }

    #[tokio::test]
    async fn test_invoke_without_continuation_is_terminal() {
        let rewriter = scenario_rewriter();

        let res = rewriter
            .invoke(request_to("a.example.com"), None::<Route>)
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get("x-served-by").is_none());
    }
}
