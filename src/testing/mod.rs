//! Stub collaborators shared by unit and integration tests.
//!
//! Compiled for `cargo test` and behind the `test-util` feature.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue};

use crate::auth::{AuthError, Authenticator, IdentityClaims};
use crate::services::{
    EventLog, EventLogError, IdentityError, IdentityEvent, IdentityRecord, IdentityService,
    InMemoryIdentityStore, NewIdentity,
};

pub fn claims(username: &str, email: &str) -> IdentityClaims {
    IdentityClaims {
        username: username.to_string(),
        email: email.to_string(),
        name: String::new(),
    }
}

pub fn authorization(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    headers
}

/// Authenticator returning a fixed answer and recording the credentials it saw
pub struct StubAuthenticator {
    claims: Option<IdentityClaims>,
    seen: Mutex<Vec<String>>,
}

impl StubAuthenticator {
    pub fn accepting(claims: IdentityClaims) -> Self {
        Self { claims: Some(claims), seen: Mutex::new(Vec::new()) }
    }

    pub fn rejecting() -> Self {
        Self { claims: None, seen: Mutex::new(Vec::new()) }
    }

    pub fn credentials_seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Authenticator for StubAuthenticator {
    async fn authenticate(&self, credential: &str, _scopes: &[String]) -> Result<IdentityClaims, AuthError> {
        self.seen.lock().unwrap().push(credential.to_string());
        self.claims
            .clone()
            .ok_or_else(|| AuthError::InvalidToken("token expired".into()))
    }
}

/// Identity store wrapper counting lookups and create calls
#[derive(Default)]
pub struct RecordingIdentityService {
    store: InMemoryIdentityStore,
    lookups: AtomicUsize,
    creates: Mutex<Vec<NewIdentity>>,
    fail_lookup: bool,
    fail_create: bool,
    create_delay: Option<Duration>,
}

impl RecordingIdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_lookup() -> Self {
        Self { fail_lookup: true, ..Self::default() }
    }

    pub fn failing_create() -> Self {
        Self { fail_create: true, ..Self::default() }
    }

    /// Hold every `create` for `delay` before writing
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    /// Backing store, bypassing the counters
    pub fn store(&self) -> &InMemoryIdentityStore {
        &self.store
    }

    /// Insert a record without counting it as a create call
    pub async fn seed(&self, username: &str) -> IdentityRecord {
        self.store
            .create(NewIdentity {
                username: username.to_string(),
                email: format!("{}@example.org", username),
                name: String::new(),
            })
            .await
            .unwrap()
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> Vec<NewIdentity> {
        self.creates.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityService for RecordingIdentityService {
    async fn find_by_username(&self, username: &str) -> Result<Option<IdentityRecord>, IdentityError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookup {
            return Err(IdentityError::Unavailable("lookup timed out".into()));
        }
        self.store.find_by_username(username).await
    }

    async fn create(&self, identity: NewIdentity) -> Result<IdentityRecord, IdentityError> {
        self.creates.lock().unwrap().push(identity.clone());
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_create {
            return Err(IdentityError::Unavailable("write capacity exceeded".into()));
        }
        self.store.create(identity).await
    }
}

/// Event log that refuses every append
pub struct FailingEventLog;

#[async_trait]
impl EventLog for FailingEventLog {
    async fn append(&self, _event: IdentityEvent) -> Result<(), EventLogError> {
        Err(EventLogError::Unavailable("stream closed".into()))
    }
}
