use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, request::Parts, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use url::{Host, Url};

use super::request_id::REQUEST_ID_HEADER;
use crate::config::EdgeConfig;
use crate::error::{ApiError, PipelineError};

/// Why an origin was allowed or denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginReason {
    NotInAllowList,
    SchemeMismatch,
    ParseError,
    LocalhostException,
    ExplicitAllow,
}

/// Per-request CORS verdict, stored in request extensions once made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginDecision {
    pub allowed: bool,
    pub reason: OriginReason,
}

impl OriginDecision {
    fn allow(reason: OriginReason) -> Self {
        Self { allowed: true, reason }
    }

    fn deny(reason: OriginReason) -> Self {
        Self { allowed: false, reason }
    }
}

/// Decide whether `origin` may call the API cross-origin.
///
/// Production origins must use https; loopback hosts are only accepted over
/// plain http. Both must be present in `allow_list` (hostnames, lower-case).
/// `local_mode` bypasses every check.
pub fn evaluate(origin: &str, allow_list: &HashSet<String>, local_mode: bool) -> OriginDecision {
    let decision = decide(origin, allow_list, local_mode);

    if decision.allowed {
        tracing::debug!(origin, reason = ?decision.reason, "origin allowed");
    } else {
        tracing::warn!(origin, reason = ?decision.reason, "origin denied");
    }

    decision
}

fn decide(origin: &str, allow_list: &HashSet<String>, local_mode: bool) -> OriginDecision {
    if local_mode {
        return OriginDecision::allow(OriginReason::ExplicitAllow);
    }

    let url = match Url::parse(origin) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!(origin, "origin parse failure: {}", e);
            return OriginDecision::deny(OriginReason::ParseError);
        }
    };

    let (hostname, loopback) = match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.to_ascii_lowercase();
            let loopback = domain == "localhost" || domain.ends_with(".localhost");
            (domain, loopback)
        }
        Some(Host::Ipv4(addr)) => (addr.to_string(), addr.is_loopback()),
        Some(Host::Ipv6(addr)) => (addr.to_string(), addr.is_loopback()),
        None => return OriginDecision::deny(OriginReason::ParseError),
    };

    if !allow_list.contains(&hostname) {
        return OriginDecision::deny(OriginReason::NotInAllowList);
    }

    match (loopback, url.scheme()) {
        (true, "http") => OriginDecision::allow(OriginReason::LocalhostException),
        (false, "https") => OriginDecision::allow(OriginReason::ExplicitAllow),
        _ => OriginDecision::deny(OriginReason::SchemeMismatch),
    }
}

/// Allow-list and local-mode flag, fixed at pipeline construction
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allow_list: HashSet<String>,
    local_mode: bool,
}

impl OriginPolicy {
    pub fn new(allow_list: HashSet<String>, local_mode: bool) -> Self {
        Self { allow_list, local_mode }
    }

    pub fn from_config(config: &EdgeConfig) -> Self {
        Self::new(config.allowed_hosts(), config.cors.local_mode)
    }

    pub fn evaluate(&self, origin: &str) -> OriginDecision {
        evaluate(origin, &self.allow_list, self.local_mode)
    }
}

/// Outermost guard: denied cross-origin calls end here with 403.
///
/// Requests without an `Origin` header are not cross-origin and pass through.
pub async fn origin_guard_middleware(
    State(policy): State<Arc<OriginPolicy>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(origin) = request.headers().get(header::ORIGIN).cloned() else {
        return next.run(request).await;
    };

    let decision = match origin.to_str() {
        Ok(value) => policy.evaluate(value),
        Err(_) => OriginDecision::deny(OriginReason::ParseError),
    };

    if decision.allowed {
        request.extensions_mut().insert(decision);
        return next.run(request).await;
    }

    let origin = String::from_utf8_lossy(origin.as_bytes()).into_owned();
    let err = match decision.reason {
        OriginReason::ParseError => PipelineError::PathUnparseable(origin),
        reason => PipelineError::OriginDenied { origin, reason },
    };

    tracing::warn!(
        method = %request.method(),
        path = %request.uri().path(),
        "request rejected: {}",
        err
    );

    ApiError::from(err).into_response()
}

/// CORS response headers for allowed origins.
///
/// Reuses the guard's decision from request extensions when present.
pub fn cors_layer(policy: Arc<OriginPolicy>) -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, parts: &Parts| {
            if let Some(decision) = parts.extensions.get::<OriginDecision>() {
                return decision.allowed;
            }
            origin
                .to_str()
                .map(|value| policy.evaluate(value).allowed)
                .unwrap_or(false)
        }))
}
