use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use super::request_id::RequestId;
use crate::auth::Authenticator;
use crate::error::PipelineError;
use crate::services::{EventLog, IdentityEvent, IdentityService, NewIdentity};

/// Result of a successful bootstrap pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Existing { identity_id: String },
    Created { identity_id: String },
}

/// Pull the credential out of `Authorization: <scheme> <credential>`.
///
/// Anything other than exactly two non-empty, single-space separated tokens
/// is skipped.
pub fn extract_credential(headers: &HeaderMap) -> Result<&str, PipelineError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(PipelineError::AuthExtractionSkipped("missing Authorization header"))?
        .to_str()
        .map_err(|_| PipelineError::AuthExtractionSkipped("Authorization header is not valid text"))?;

    let tokens: Vec<&str> = value.split(' ').collect();
    match tokens.as_slice() {
        [scheme, credential] if !scheme.is_empty() && !credential.is_empty() => Ok(*credential),
        _ => Err(PipelineError::AuthExtractionSkipped(
            "expected '<scheme> <credential>' in Authorization header",
        )),
    }
}

/// Lazily provisions a local identity for first-time authenticated callers
pub struct IdentityBootstrap {
    authenticator: Arc<dyn Authenticator>,
    identities: Arc<dyn IdentityService>,
    events: Arc<dyn EventLog>,
}

impl IdentityBootstrap {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        identities: Arc<dyn IdentityService>,
        events: Arc<dyn EventLog>,
    ) -> Self {
        Self { authenticator, identities, events }
    }

    /// Look up the caller's identity and create it when absent.
    ///
    /// There is no per-username locking: two concurrent first requests may
    /// both attempt creation, and the store's uniqueness check decides.
    pub async fn ensure(&self, headers: &HeaderMap) -> Result<BootstrapOutcome, PipelineError> {
        let credential = extract_credential(headers)?;
        let claims = self.authenticator.authenticate(credential, &[]).await?;

        let existing = self
            .identities
            .find_by_username(&claims.username)
            .await
            .map_err(|source| PipelineError::IdentityLookupFailed {
                username: claims.username.clone(),
                source,
            })?;

        if let Some(record) = existing {
            return Ok(BootstrapOutcome::Existing { identity_id: record.id });
        }

        let new_identity = NewIdentity::from(&claims);
        tracing::debug!(username = %new_identity.username, email = %new_identity.email, "creating new identity");

        let record = self
            .identities
            .create(new_identity)
            .await
            .map_err(|source| PipelineError::IdentityCreationFailed {
                username: claims.username.clone(),
                source,
            })?;

        if let Err(e) = self.events.append(IdentityEvent::created(&record)).await {
            tracing::error!(identity_id = %record.id, "failed to record identity creation event: {}", e);
        }

        tracing::info!(identity_id = %record.id, username = %record.username, "identity created");
        Ok(BootstrapOutcome::Created { identity_id: record.id })
    }
}

/// Runs [`IdentityBootstrap::ensure`] before the business handler.
///
/// The outcome is logged and discarded: the request always proceeds. The
/// bootstrap runs on its own task so a client disconnect cannot abort an
/// identity creation halfway through.
pub async fn identity_bootstrap_middleware(
    State(bootstrap): State<Arc<IdentityBootstrap>>,
    request: Request,
    next: Next,
) -> Response {
    let headers = request.headers().clone();
    let task = tokio::spawn(
        async move { bootstrap.ensure(&headers).await }.instrument(tracing::Span::current()),
    );

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.to_string())
        .unwrap_or_default();

    match task.await {
        Ok(Ok(outcome)) => {
            tracing::debug!(%method, %path, %request_id, ?outcome, "identity bootstrap done");
        }
        Ok(Err(err @ PipelineError::AuthExtractionSkipped(_))) => {
            tracing::debug!(%method, %path, %request_id, "identity bootstrap skipped: {}", err);
        }
        Ok(Err(err @ PipelineError::AuthenticationFailed(_))) => {
            tracing::warn!(%method, %path, %request_id, "identity bootstrap: {}", err);
        }
        Ok(Err(err)) => {
            tracing::error!(%method, %path, %request_id, "identity bootstrap: {}", err);
        }
        Err(join_err) => {
            tracing::error!(%method, %path, %request_id, "identity bootstrap task failed: {}", join_err);
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryEventLog;
    use crate::testing::{
        authorization, claims, FailingEventLog, RecordingIdentityService, StubAuthenticator,
    };

    fn bootstrap(
        authenticator: Arc<StubAuthenticator>,
        identities: Arc<RecordingIdentityService>,
        events: Arc<dyn EventLog>,
    ) -> IdentityBootstrap {
        IdentityBootstrap::new(authenticator, identities, events)
    }

    #[test]
    fn test_extract_credential_shapes() {
        let bearer = authorization("Bearer abc123");
        assert_eq!(extract_credential(&bearer).unwrap(), "abc123");
        let token = authorization("Token xyz");
        assert_eq!(extract_credential(&token).unwrap(), "xyz");

        for malformed in ["Bearer", "Bearer ", "Bearer  abc123", "Bearer abc 123", " abc123", "abc123"] {
            let headers = authorization(malformed);
            let result = extract_credential(&headers);
            assert!(
                matches!(result, Err(PipelineError::AuthExtractionSkipped(_))),
                "{:?} should be skipped",
                malformed
            );
        }

        let empty = HeaderMap::new();
        let result = extract_credential(&empty);
        assert!(matches!(result, Err(PipelineError::AuthExtractionSkipped(_))));
    }

    #[tokio::test]
    async fn test_new_subject_created_with_one_event() {
        let authenticator = Arc::new(StubAuthenticator::accepting(claims("alice", "a@x.com")));
        let identities = Arc::new(RecordingIdentityService::new());
        let events = Arc::new(InMemoryEventLog::new());
        let bootstrap = bootstrap(authenticator.clone(), identities.clone(), events.clone());

        let outcome = bootstrap.ensure(&authorization("Bearer abc123")).await.unwrap();

        assert_eq!(authenticator.credentials_seen(), vec!["abc123".to_string()]);
        let creates = identities.create_calls();
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].username, "alice");
        assert_eq!(creates[0].email, "a@x.com");

        let recorded = events.events().await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(outcome, BootstrapOutcome::Created { identity_id: recorded[0].identity_id.clone() });
        assert_eq!(recorded[0].payload["username"], "alice");
    }

    #[tokio::test]
    async fn test_existing_subject_is_left_alone() {
        let authenticator = Arc::new(StubAuthenticator::accepting(claims("alice", "a@x.com")));
        let identities = Arc::new(RecordingIdentityService::new());
        let seeded = identities.seed("alice").await;
        let events = Arc::new(InMemoryEventLog::new());
        let bootstrap = bootstrap(authenticator, identities.clone(), events.clone());

        let outcome = bootstrap.ensure(&authorization("Bearer abc123")).await.unwrap();

        assert_eq!(outcome, BootstrapOutcome::Existing { identity_id: seeded.id });
        assert!(identities.create_calls().is_empty());
        assert!(events.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_second_pass_performs_no_creation() {
        let authenticator = Arc::new(StubAuthenticator::accepting(claims("dave", "d@x.com")));
        let identities = Arc::new(RecordingIdentityService::new());
        let events = Arc::new(InMemoryEventLog::new());
        let bootstrap = bootstrap(authenticator, identities.clone(), events.clone());
        let headers = authorization("Bearer t0k3n");

        let first = bootstrap.ensure(&headers).await.unwrap();
        let second = bootstrap.ensure(&headers).await.unwrap();

        assert!(matches!(first, BootstrapOutcome::Created { .. }));
        assert!(matches!(second, BootstrapOutcome::Existing { .. }));
        assert_eq!(identities.create_calls().len(), 1);
        assert_eq!(events.events().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_reported_not_raised() {
        let events: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::new());

        let rejected = bootstrap(
            Arc::new(StubAuthenticator::rejecting()),
            Arc::new(RecordingIdentityService::new()),
            events.clone(),
        );
        assert!(matches!(
            rejected.ensure(&authorization("Bearer stale")).await,
            Err(PipelineError::AuthenticationFailed(_))
        ));

        let lookup_down = bootstrap(
            Arc::new(StubAuthenticator::accepting(claims("erin", "e@x.com"))),
            Arc::new(RecordingIdentityService::failing_lookup()),
            events.clone(),
        );
        assert!(matches!(
            lookup_down.ensure(&authorization("Bearer abc")).await,
            Err(PipelineError::IdentityLookupFailed { .. })
        ));

        let create_down = bootstrap(
            Arc::new(StubAuthenticator::accepting(claims("erin", "e@x.com"))),
            Arc::new(RecordingIdentityService::failing_create()),
            events,
        );
        assert!(matches!(
            create_down.ensure(&authorization("Bearer abc")).await,
            Err(PipelineError::IdentityCreationFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_event_log_failure_keeps_created_identity() {
        let identities = Arc::new(RecordingIdentityService::new());
        let bootstrap = bootstrap(
            Arc::new(StubAuthenticator::accepting(claims("frank", "f@x.com"))),
            identities.clone(),
            Arc::new(FailingEventLog),
        );

        let outcome = bootstrap.ensure(&authorization("Bearer abc")).await.unwrap();
        assert!(matches!(outcome, BootstrapOutcome::Created { .. }));
        assert_eq!(identities.create_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_skipped_when_no_credential() {
        let authenticator = Arc::new(StubAuthenticator::accepting(claims("alice", "a@x.com")));
        let identities = Arc::new(RecordingIdentityService::new());
        let bootstrap = bootstrap(authenticator.clone(), identities.clone(), Arc::new(InMemoryEventLog::new()));

        let result = bootstrap.ensure(&HeaderMap::new()).await;
        assert!(matches!(result, Err(PipelineError::AuthExtractionSkipped(_))));
        assert!(authenticator.credentials_seen().is_empty());
        assert_eq!(identities.lookups(), 0);
    }
}
