use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::IdentityClaims;

/// Local identity record for an authenticated subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when asking the store to create an identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub name: String,
}

impl From<&IdentityClaims> for NewIdentity {
    fn from(claims: &IdentityClaims) -> Self {
        Self {
            username: claims.username.clone(),
            email: claims.email.clone(),
            name: claims.name.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity already exists: {0}")]
    Duplicate(String),
    #[error("identity store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<IdentityRecord>, IdentityError>;

    async fn create(&self, identity: NewIdentity) -> Result<IdentityRecord, IdentityError>;
}

/// Process-local identity store keyed by username.
///
/// Enforces username uniqueness, so concurrent first requests for the same
/// subject produce one record and one `Duplicate` error.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    records: RwLock<HashMap<String, IdentityRecord>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl IdentityService for InMemoryIdentityStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<IdentityRecord>, IdentityError> {
        Ok(self.records.read().await.get(username).cloned())
    }

    async fn create(&self, identity: NewIdentity) -> Result<IdentityRecord, IdentityError> {
        let mut records = self.records.write().await;
        if records.contains_key(&identity.username) {
            return Err(IdentityError::Duplicate(identity.username));
        }

        let record = IdentityRecord {
            id: Uuid::new_v4().to_string(),
            username: identity.username,
            email: identity.email,
            name: identity.name,
            created_at: Utc::now(),
        };
        records.insert(record.username.clone(), record.clone());

        tracing::debug!(identity_id = %record.id, username = %record.username, "identity stored");
        Ok(record)
    }
}
