#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Router;
use tower::ServiceExt;

use agreement_edge::api::{build_pipeline, EdgeDependencies};
use agreement_edge::auth::{AuthError, Authenticator, IdentityClaims};
use agreement_edge::config::EdgeConfig;
use agreement_edge::middleware::{RequestIdGenerator, UuidGenerator};
use agreement_edge::services::InMemoryEventLog;
use agreement_edge::testing::RecordingIdentityService;

pub fn test_config() -> EdgeConfig {
    let mut config = EdgeConfig::development();
    config.cors.allowed_origins = vec!["localhost".into(), "corporate.example.org".into(), "example.com".into()];
    config.cors.local_mode = false;
    config.auth.jwt_secret = "integration-secret".into();
    config
}

/// Authenticator answering from a fixed credential table
#[derive(Default)]
pub struct ScriptedAuthenticator {
    tokens: HashMap<String, IdentityClaims>,
}

impl ScriptedAuthenticator {
    pub fn with(mut self, credential: &str, username: &str, email: &str) -> Self {
        self.tokens.insert(
            credential.to_string(),
            IdentityClaims {
                username: username.to_string(),
                email: email.to_string(),
                name: String::new(),
            },
        );
        self
    }
}

#[async_trait]
impl Authenticator for ScriptedAuthenticator {
    async fn authenticate(&self, credential: &str, _scopes: &[String]) -> Result<IdentityClaims, AuthError> {
        self.tokens
            .get(credential)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken("signature mismatch".into()))
    }
}

/// Composed pipeline with counting API trees and inspectable collaborators
pub struct Harness {
    pub app: Router,
    pub identities: Arc<RecordingIdentityService>,
    pub events: Arc<InMemoryEventLog>,
    pub v1_hits: Arc<AtomicUsize>,
    pub v2_hits: Arc<AtomicUsize>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(test_config(), RecordingIdentityService::new())
    }

    pub fn with(config: EdgeConfig, identities: RecordingIdentityService) -> Self {
        Self::build(config, identities, Arc::new(UuidGenerator))
    }

    pub fn build(
        config: EdgeConfig,
        identities: RecordingIdentityService,
        request_ids: Arc<dyn RequestIdGenerator>,
    ) -> Self {
        let authenticator = ScriptedAuthenticator::default()
            .with("abc123", "alice", "a@x.com")
            .with("bob-token", "bob", "bob@x.com");

        let identities = Arc::new(identities);
        let events = Arc::new(InMemoryEventLog::new());
        let v1_hits = Arc::new(AtomicUsize::new(0));
        let v2_hits = Arc::new(AtomicUsize::new(0));

        let deps = EdgeDependencies {
            config,
            authenticator: Arc::new(authenticator),
            identities: identities.clone(),
            events: events.clone(),
            request_ids,
        };

        let app = build_pipeline(
            &deps,
            counting_tree("v1", v1_hits.clone()),
            counting_tree("v2", v2_hits.clone()),
        );

        Self { app, identities, events, v1_hits, v2_hits }
    }

    pub async fn send(&self, request: Request) -> Result<Response> {
        Ok(self.app.clone().oneshot(request).await?)
    }

    pub fn hits(&self) -> (usize, usize) {
        (self.v1_hits.load(Ordering::SeqCst), self.v2_hits.load(Ordering::SeqCst))
    }
}

/// Tree answering every path with its label, echoing the request id it saw
pub fn counting_tree(label: &'static str, hits: Arc<AtomicUsize>) -> Router {
    Router::new().fallback(move |headers: HeaderMap| {
        let hits = hits.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            let seen = headers
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            ([("x-tree", label.to_string()), ("x-seen-request-id", seen)], label)
        }
    })
}

pub fn get(uri: &str) -> axum::http::request::Builder {
    Request::builder().method("GET").uri(uri)
}

pub fn empty(builder: axum::http::request::Builder) -> Request {
    builder.body(Body::empty()).expect("valid request")
}

pub async fn body_text(response: Response) -> Result<String> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

/// Serve `app` on a free local port, returning its base URL
pub async fn spawn_server(app: Router) -> Result<String> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to bind port {}", port))?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("test server stopped: {}", e);
        }
    });

    Ok(format!("http://127.0.0.1:{}", port))
}
